//! Disambiguates whether a request path names a stream or a record inside
//! one (spec.md §4.1). This is the system's central naming decision: the
//! materialized `path` column on both `stream` and `record` keeps
//! resolution at two indexed lookups instead of a tree walk.

use infra::table::{streams::StreamRecord, records::RecordRecord};

use crate::errors::{ApiError, Result};

pub enum Resolved {
    Stream(StreamRecord),
    Record {
        stream: StreamRecord,
        record: RecordRecord,
    },
    NotFound,
}

/// `raw_path` is the request path with pod-relative leading slash already
/// stripped (e.g. `notes/greet`, never `/notes/greet`).
pub async fn resolve(pod: &str, raw_path: &str, has_index_query: bool) -> Result<Resolved> {
    let path = normalize(raw_path);

    if has_index_query {
        // With an index query the entire path MUST name a stream.
        return match infra::table::streams::get_by_path(pod, &path).await? {
            Some(s) => Ok(Resolved::Stream(s)),
            None => Ok(Resolved::NotFound),
        };
    }

    if let Some(stream) = infra::table::streams::get_by_path(pod, &path).await? {
        return Ok(Resolved::Stream(stream));
    }

    // Not a stream: try treating the path as `<stream_path>/<record_name>`.
    let Some((stream_path, record_name)) = split_last_segment(&path) else {
        return Ok(Resolved::NotFound);
    };
    let Some(stream) = infra::table::streams::get_by_path(pod, &stream_path).await? else {
        return Ok(Resolved::NotFound);
    };
    match infra::table::records::get_latest_by_name(stream.id, &record_name).await? {
        Some(record) => Ok(Resolved::Record { stream, record }),
        None => Ok(Resolved::NotFound),
    }
}

/// For write operations, the last segment is always the record name; the
/// prefix is the stream path, which the caller creates if missing.
pub fn split_for_write(raw_path: &str) -> Result<(String, String)> {
    let path = normalize(raw_path);
    split_last_segment(&path).ok_or_else(|| ApiError::InvalidName("path has no record segment".into()))
}

fn normalize(raw_path: &str) -> String {
    let trimmed = raw_path.trim_matches('/');
    format!("/{trimmed}")
}

fn split_last_segment(path: &str) -> Option<(String, String)> {
    let trimmed = path.trim_start_matches('/');
    let idx = trimmed.rfind('/');
    match idx {
        Some(i) => {
            let (prefix, last) = trimmed.split_at(i);
            let last = &last[1..];
            if last.is_empty() {
                None
            } else {
                Some((format!("/{prefix}"), last.to_string()))
            }
        }
        None => {
            if trimmed.is_empty() {
                None
            } else {
                Some(("/".to_string(), trimmed.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_single_segment() {
        let (stream, name) = split_for_write("greet").unwrap();
        assert_eq!(stream, "/");
        assert_eq!(name, "greet");
    }

    #[test]
    fn splits_nested_segment() {
        let (stream, name) = split_for_write("notes/greet").unwrap();
        assert_eq!(stream, "/notes");
        assert_eq!(name, "greet");
    }

    #[test]
    fn splits_deep_segment() {
        let (stream, name) = split_for_write("/a/b/c/d").unwrap();
        assert_eq!(stream, "/a/b/c");
        assert_eq!(name, "d");
    }
}

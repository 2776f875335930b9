use std::collections::HashMap;

/// Prefix tree over `:`-delimited cache key segments. Each node optionally
/// terminates a full key (`own_key`); branch nodes carry a child map.
#[derive(Default)]
pub struct TreeNode {
    children: HashMap<String, TreeNode>,
    own_key: Option<String>,
}

impl TreeNode {
    pub fn insert(&mut self, segments: &[String], full_key: String) {
        let mut node = self;
        for seg in segments {
            node = node.children.entry(seg.clone()).or_default();
        }
        node.own_key = Some(full_key);
    }

    /// Removes the exact key addressed by `segments`, pruning now-empty
    /// ancestors. Returns whether a key was actually present.
    pub fn remove(&mut self, segments: &[String]) -> bool {
        fn go(node: &mut TreeNode, segments: &[String]) -> bool {
            if segments.is_empty() {
                let had = node.own_key.is_some();
                node.own_key = None;
                return had;
            }
            let (head, rest) = (&segments[0], &segments[1..]);
            let Some(child) = node.children.get_mut(head) else {
                return false;
            };
            let removed = go(child, rest);
            if child.children.is_empty() && child.own_key.is_none() {
                node.children.remove(head);
            }
            removed
        }
        go(self, segments)
    }

    /// Navigates to the node addressed by `prefix`, detaches its entire
    /// subtree from the parent, and returns every full key that subtree
    /// contained. O(prefix depth + keys removed).
    pub fn remove_subtree(&mut self, prefix: &[String]) -> Vec<String> {
        let Some((last, parents)) = prefix.split_last() else {
            return vec![];
        };
        let mut node = self;
        for seg in parents {
            match node.children.get_mut(seg) {
                Some(next) => node = next,
                None => return vec![],
            }
        }
        match node.children.remove(last) {
            Some(mut subtree) => {
                let mut keys = Vec::new();
                collect(&mut subtree, &mut keys);
                keys
            }
            None => vec![],
        }
    }
}

fn collect(node: &mut TreeNode, out: &mut Vec<String>) {
    if let Some(key) = node.own_key.take() {
        out.push(key);
    }
    for (_, mut child) in node.children.drain() {
        collect(&mut child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(s: &str) -> Vec<String> {
        s.split(':').map(String::from).collect()
    }

    #[test]
    fn insert_remove_roundtrip() {
        let mut t = TreeNode::default();
        t.insert(&segs("a:b:c"), "a:b:c".into());
        assert!(t.remove(&segs("a:b:c")));
        assert!(t.children.is_empty());
    }

    #[test]
    fn subtree_removal_collects_all_descendants() {
        let mut t = TreeNode::default();
        t.insert(&segs("a:b:c"), "a:b:c".into());
        t.insert(&segs("a:b:d"), "a:b:d".into());
        t.insert(&segs("a:x"), "a:x".into());

        let mut removed = t.remove_subtree(&segs("a:b"));
        removed.sort();
        assert_eq!(removed, vec!["a:b:c".to_string(), "a:b:d".to_string()]);
        // sibling survives
        assert_eq!(t.remove_subtree(&segs("a:x")), vec!["a:x".to_string()]);
    }

    #[test]
    fn remove_subtree_on_missing_prefix_is_empty() {
        let mut t = TreeNode::default();
        t.insert(&segs("a:b"), "a:b".into());
        assert!(t.remove_subtree(&segs("z:y")).is_empty());
    }
}

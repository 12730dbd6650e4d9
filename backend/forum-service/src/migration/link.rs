/// Pure tree-edge resolution for the post transfer's second pass.
use std::collections::HashMap;
use uuid::Uuid;

/// Legacy tree edges recorded during pass 1: legacy post id mapped to its
/// legacy (root, parent) ids. `None` means the post is its own root or
/// parent, as legacy top-level posts stored NULL there.
pub type Relations = HashMap<i64, (Option<i64>, Option<i64>)>;

/// Root and parent links ready for a batch update, as (id, root, parent)
/// target ids.
pub type Links = Vec<(Uuid, Uuid, Uuid)>;

/// Resolve recorded legacy tree edges against the legacy-id to target-id
/// map built after pass 1. Posts whose root or parent cannot be resolved
/// are returned as orphans rather than linked half-way.
pub fn resolve_relations(relations: &Relations, id_map: &HashMap<i64, Uuid>) -> (Links, Vec<i64>) {
    let mut links = Vec::with_capacity(relations.len());
    let mut orphans = Vec::new();

    for (&legacy_id, &(root_legacy, parent_legacy)) in relations {
        let Some(&id) = id_map.get(&legacy_id) else {
            // Not present in the target, e.g. skipped for a missing author.
            orphans.push(legacy_id);
            continue;
        };

        let root_legacy = root_legacy.unwrap_or(legacy_id);
        let parent_legacy = parent_legacy.unwrap_or(root_legacy);

        match (id_map.get(&root_legacy), id_map.get(&parent_legacy)) {
            (Some(&root), Some(&parent)) => links.push((id, root, parent)),
            _ => orphans.push(legacy_id),
        }
    }

    // Deterministic order for logging and batch updates.
    links.sort_unstable();
    orphans.sort_unstable();

    (links, orphans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_map(ids: &[i64]) -> HashMap<i64, Uuid> {
        ids.iter().map(|&id| (id, Uuid::new_v4())).collect()
    }

    #[test]
    fn top_level_post_links_to_itself() {
        let relations = Relations::from([(5, (None, None))]);
        let ids = id_map(&[5]);

        let (links, orphans) = resolve_relations(&relations, &ids);

        assert!(orphans.is_empty());
        assert_eq!(links, vec![(ids[&5], ids[&5], ids[&5])]);
    }

    #[test]
    fn reply_created_in_same_sweep_as_parent_links_correctly() {
        // Legacy id 5 is a top-level post, id 7 replies to it. Both are
        // created in pass 1; the edge resolves in pass 2.
        let relations = Relations::from([(5, (None, None)), (7, (Some(5), Some(5)))]);
        let ids = id_map(&[5, 7]);

        let (links, orphans) = resolve_relations(&relations, &ids);

        assert!(orphans.is_empty());
        assert_eq!(links.len(), 2);
        assert!(links.contains(&(ids[&7], ids[&5], ids[&5])));
    }

    #[test]
    fn parent_defaults_to_root_when_absent() {
        let relations = Relations::from([(9, (Some(2), None))]);
        let ids = id_map(&[2, 9]);

        let (links, _) = resolve_relations(&relations, &ids);

        assert_eq!(links, vec![(ids[&9], ids[&2], ids[&2])]);
    }

    #[test]
    fn unresolvable_root_orphans_the_post() {
        let relations = Relations::from([(7, (Some(5), Some(5)))]);
        let ids = id_map(&[7]);

        let (links, orphans) = resolve_relations(&relations, &ids);

        assert!(links.is_empty());
        assert_eq!(orphans, vec![7]);
    }

    #[test]
    fn post_skipped_in_pass_one_is_reported_not_linked() {
        let relations = Relations::from([(3, (None, None))]);
        let ids = id_map(&[]);

        let (links, orphans) = resolve_relations(&relations, &ids);

        assert!(links.is_empty());
        assert_eq!(orphans, vec![3]);
    }
}

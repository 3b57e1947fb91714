//! Size-bounded batching of the change set

use crate::model::FileDescriptor;

use super::types::Batch;

/// Greedily partition `changes` into batches, preserving order.
///
/// A file joins the current batch while the running total stays under
/// `ceiling`. A file that would push the batch to or past the ceiling
/// starts a new one, so an oversized file always ends up alone.
pub fn plan_batches(changes: Vec<FileDescriptor>, ceiling: u64) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::new();

    for entry in changes {
        let fits = current.size().saturating_add(entry.size()) < ceiling;
        if !current.is_empty() && !fits {
            batches.push(std::mem::take(&mut current));
        }
        current.push(entry);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileStat;
    use time::OffsetDateTime;

    const MIB: u64 = 1024 * 1024;
    const CEILING: u64 = 64 * MIB;

    fn file(path: &str, size: u64) -> FileDescriptor {
        FileDescriptor::new(
            path,
            FileStat { size, mtime: OffsetDateTime::UNIX_EPOCH, mime: None },
        )
    }

    fn paths(batch: &Batch) -> Vec<&str> {
        batch.entries().iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        assert!(plan_batches(Vec::new(), CEILING).is_empty());
    }

    #[test]
    fn test_oversized_file_alone() {
        let mut changes = vec![file("big.bin", 100 * MIB)];
        changes.extend((0..9).map(|i| file(&format!("small_{}.txt", i), MIB)));

        let batches = plan_batches(changes, CEILING);

        assert_eq!(batches.len(), 2);
        assert_eq!(paths(&batches[0]), vec!["big.bin"]);
        assert_eq!(batches[1].len(), 9);
        assert_eq!(batches[1].size(), 9 * MIB);
    }

    #[test]
    fn test_oversized_file_in_the_middle() {
        let changes = vec![file("a", MIB), file("big", 70 * MIB), file("b", MIB)];
        let batches = plan_batches(changes, CEILING);

        let grouped: Vec<Vec<&str>> = batches.iter().map(paths).collect();
        assert_eq!(grouped, vec![vec!["a"], vec!["big"], vec!["b"]]);
    }

    #[test]
    fn test_total_stays_strictly_under_ceiling() {
        // 32 + 32 reaches the ceiling exactly, so the second file starts a new batch
        let changes = vec![file("a", 32 * MIB), file("b", 32 * MIB), file("c", 31 * MIB)];
        let batches = plan_batches(changes, CEILING);

        let grouped: Vec<Vec<&str>> = batches.iter().map(paths).collect();
        assert_eq!(grouped, vec![vec!["a"], vec!["b", "c"]]);
    }

    #[test]
    fn test_deletions_do_not_consume_budget() {
        let changes = vec![
            file("a", 63 * MIB),
            FileDescriptor::deletion("gone1"),
            FileDescriptor::deletion("gone2"),
        ];
        let batches = plan_batches(changes, CEILING);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_partition_preserves_order() {
        let sizes = [5, 40, 30, 1, 64, 0, 63, 2, 20, 20, 20];
        let changes: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, s)| file(&format!("f{}", i), s * MIB))
            .collect();

        let batches = plan_batches(changes.clone(), CEILING);

        let flattened: Vec<FileDescriptor> =
            batches.iter().flat_map(|b| b.entries().to_vec()).collect();
        assert_eq!(flattened, changes);

        for batch in &batches {
            assert!(!batch.is_empty());
            assert!(batch.len() == 1 || batch.size() < CEILING);
        }
    }
}

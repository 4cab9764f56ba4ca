use std::ops::Range;
use std::thread;

use log::debug;

use crate::config::AuditError;

/// Splits `0..num_items` into `num_workers` contiguous ranges of nearly equal
/// length. Empty ranges are dropped.
pub(crate) fn partition(num_items: u64, num_workers: usize) -> Vec<Range<u64>> {
    let workers = num_workers.max(1) as u64;
    let mut ranges = Vec::new();
    let mut start = 0;
    for worker in 0..workers {
        let len = num_items / workers + u64::from(num_items % workers > worker);
        if len > 0 {
            ranges.push(start..start + len);
        }
        start += len;
    }
    ranges
}

/// Runs `job` once per range on its own thread and returns the partial
/// results in range order.
///
/// The first error in range order wins. With a single range no thread is
/// spawned.
pub(crate) fn run_partitioned<T, F>(
    num_items: u64,
    num_workers: usize,
    job: F,
) -> Result<Vec<T>, AuditError>
where
    T: Send,
    F: Fn(Range<u64>) -> Result<T, AuditError> + Sync,
{
    let ranges = partition(num_items, num_workers);
    if ranges.len() <= 1 {
        return ranges.into_iter().map(&job).collect();
    }
    debug!("run_partitioned: ranges {:?}", ranges);
    thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .into_iter()
            .map(|range| {
                let job = &job;
                scope.spawn(move || job(range))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_everything() {
        assert_eq!(partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(2, 4), vec![0..1, 1..2]);
        assert_eq!(partition(0, 4), Vec::<Range<u64>>::new());
        assert_eq!(partition(5, 0), vec![0..5]);
    }

    #[test]
    fn results_come_back_in_order() {
        let sums = run_partitioned(100, 4, |r| Ok(r.sum::<u64>())).unwrap();
        assert_eq!(sums.len(), 4);
        assert_eq!(sums.iter().sum::<u64>(), (0..100).sum::<u64>());
        let err = run_partitioned(100, 4, |r| {
            if r.start > 0 {
                Err(AuditError::InvalidInput(format!("{}", r.start)))
            } else {
                Ok(())
            }
        });
        assert_eq!(err, Err(AuditError::InvalidInput("25".to_string())));
    }
}

//! Static chunked row scheduling on a fixed-size rayon pool
//!
//! Rows are cut into contiguous chunks of `chunk_size`; chunk `c` belongs
//! to lane `c % n_threads`. Each lane is one task on the pool, so the row
//! assignment is fixed before the loop starts and rows are never stolen
//! from one lane by another. Output buffers are split into disjoint `&mut`
//! segments up front by [`StaticSchedule::partition_by`], which is what lets
//! the lanes write without any synchronisation.
//!
//! The same partition drives the kernel and the parallel layout fill, so
//! each lane first touches the slots it later reads.

use std::ops::Range;

use rayon::ThreadPool;

use crate::error::Result;
use crate::utils::try_with_capacity;

/// Static round-robin assignment of row chunks to lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSchedule {
    n_threads: usize,
    chunk_size: usize,
}

impl StaticSchedule {
    /// Creates a schedule; zero values are clamped to 1
    pub fn new(n_threads: usize, chunk_size: usize) -> Self {
        Self {
            n_threads: n_threads.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of lanes
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Rows per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks needed for `n_rows` rows
    pub fn n_chunks(&self, n_rows: usize) -> usize {
        n_rows.div_ceil(self.chunk_size)
    }

    /// Lane that owns chunk `chunk`
    pub fn owner_of_chunk(&self, chunk: usize) -> usize {
        chunk % self.n_threads
    }

    /// Rows covered by chunk `chunk`
    pub fn chunk_rows(&self, chunk: usize, n_rows: usize) -> Range<usize> {
        let start = (chunk * self.chunk_size).min(n_rows);
        start..(start + self.chunk_size).min(n_rows)
    }

    /// Row ranges handled by `lane`, in execution order
    pub fn rows_for_lane(&self, lane: usize, n_rows: usize) -> Vec<Range<usize>> {
        (0..self.n_chunks(n_rows))
            .filter(|&chunk| self.owner_of_chunk(chunk) == lane)
            .map(|chunk| self.chunk_rows(chunk, n_rows))
            .collect()
    }

    /// Splits `y` into one slot per row, grouped by lane
    pub fn partition<'a, U>(&self, y: &'a mut [U]) -> LanePartition<'a, U> {
        let n_rows = y.len();
        self.partition_by(n_rows, y, |row| row)
    }

    /// Splits `buf` by row, where row `r` owns slots `offset(r)..offset(r + 1)`
    ///
    /// # Panics
    ///
    /// Panics unless `offset(0) == 0`, `offset(n_rows) == buf.len()` and
    /// `offset` is non-decreasing.
    pub fn partition_by<'a, U, O>(
        &self,
        n_rows: usize,
        buf: &'a mut [U],
        offset: O,
    ) -> LanePartition<'a, U>
    where
        O: Fn(usize) -> usize,
    {
        assert_eq!(offset(0), 0, "row offsets must start at 0");
        assert_eq!(offset(n_rows), buf.len(), "row offsets must cover the buffer");

        let mut lanes: Vec<Vec<Segment<'a, U>>> =
            (0..self.n_threads).map(|_| Vec::new()).collect();
        let mut rest = buf;
        for chunk in 0..self.n_chunks(n_rows) {
            let rows = self.chunk_rows(chunk, n_rows);
            let base = offset(rows.start);
            let len = offset(rows.end) - base;
            let (slots, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            lanes[self.owner_of_chunk(chunk)].push(Segment { rows, base, slots });
        }

        LanePartition { lanes, n_rows }
    }

    /// Sets `y[i] = row_fn(i)` for every row, in parallel on `pool`
    ///
    /// Returns only after every lane has finished, so `y` is fully written
    /// when this call returns.
    pub fn run<T, F>(&self, pool: &ThreadPool, y: &mut [T], row_fn: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        self.partition(y).assign(pool, row_fn);
    }

    /// Allocates `offset(n_rows)` slots and sets slot `k`, owned by row `r`,
    /// to `value(r, k)`
    ///
    /// With a pool each lane initialises the rows it owns, so every page is
    /// first touched by the worker that later reads it. Without one the
    /// lanes run one after another on the caller.
    ///
    /// # Errors
    ///
    /// Fails with `AllocationFailed` if the buffer cannot be reserved.
    pub fn try_init_rows<U, O, F>(
        &self,
        what: &'static str,
        pool: Option<&ThreadPool>,
        n_rows: usize,
        offset: O,
        value: F,
    ) -> Result<Vec<U>>
    where
        U: Send,
        O: Fn(usize) -> usize + Sync,
        F: Fn(usize, usize) -> U + Sync,
    {
        let len = offset(n_rows);
        let mut buf: Vec<U> = try_with_capacity(what, len)?;

        let slots = &mut buf.spare_capacity_mut()[..len];
        self.partition_by(n_rows, slots, &offset)
            .fill_rows(pool, &offset, |_, row, slots| {
                let first = offset(row);
                for (k, slot) in slots.iter_mut().enumerate() {
                    slot.write(value(row, first + k));
                }
            });

        // SAFETY: the partition covers 0..len with disjoint row slices and
        // fill_rows wrote every slot of every row; a panic above skips this.
        unsafe { buf.set_len(len) };
        Ok(buf)
    }
}

/// Contiguous rows of one chunk and the slots they own
struct Segment<'a, U> {
    rows: Range<usize>,
    base: usize,
    slots: &'a mut [U],
}

/// A buffer split into per-lane segments by a [`StaticSchedule`]
///
/// Built once per invocation; running it again reuses the same split, so
/// nothing is allocated between repetitions.
pub struct LanePartition<'a, U> {
    lanes: Vec<Vec<Segment<'a, U>>>,
    n_rows: usize,
}

impl<'a, U: Send> LanePartition<'a, U> {
    /// Number of rows covered
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of lanes
    pub fn n_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Row ranges held by `lane`, in execution order
    pub fn lane_rows(&self, lane: usize) -> Vec<Range<usize>> {
        self.lanes
            .get(lane)
            .map(|segments| segments.iter().map(|s| s.rows.clone()).collect())
            .unwrap_or_default()
    }

    /// Sets the single slot of every row `i` to `row_fn(i)`
    ///
    /// Only meaningful for partitions with one slot per row, as built by
    /// [`StaticSchedule::partition`].
    pub fn assign<F>(&mut self, pool: &ThreadPool, row_fn: F)
    where
        F: Fn(usize) -> U + Sync,
    {
        self.for_each_lane(Some(pool), |_, segment| {
            for (row, out) in segment.rows.clone().zip(segment.slots.iter_mut()) {
                *out = row_fn(row);
            }
        });
    }

    /// Calls `fill(lane, row, slots)` for every row with that row's slots
    ///
    /// `offset` must be the function the partition was built with. Without
    /// a pool the lanes run in order on the calling thread.
    pub fn fill_rows<O, F>(&mut self, pool: Option<&ThreadPool>, offset: O, fill: F)
    where
        O: Fn(usize) -> usize + Sync,
        F: Fn(usize, usize, &mut [U]) + Sync,
    {
        self.for_each_lane(pool, |lane, segment| {
            for row in segment.rows.clone() {
                let slots = offset(row) - segment.base..offset(row + 1) - segment.base;
                fill(lane, row, &mut segment.slots[slots]);
            }
        });
    }

    fn for_each_lane<F>(&mut self, pool: Option<&ThreadPool>, body: F)
    where
        F: Fn(usize, &mut Segment<'a, U>) + Sync,
    {
        let Some(pool) = pool else {
            for (lane, segments) in self.lanes.iter_mut().enumerate() {
                for segment in segments.iter_mut() {
                    body(lane, segment);
                }
            }
            return;
        };

        let body = &body;
        pool.scope(|s| {
            for (lane, segments) in self.lanes.iter_mut().enumerate() {
                if segments.is_empty() {
                    continue;
                }
                s.spawn(move |_| {
                    for segment in segments.iter_mut() {
                        body(lane, segment);
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::ThreadPoolBuilder;
    use std::sync::Mutex;

    #[test]
    fn test_round_robin_ownership() {
        let schedule = StaticSchedule::new(3, 2);
        assert_eq!(schedule.n_chunks(11), 6);
        assert_eq!(schedule.rows_for_lane(0, 11), vec![0..2, 6..8]);
        assert_eq!(schedule.rows_for_lane(1, 11), vec![2..4, 8..10]);
        assert_eq!(schedule.rows_for_lane(2, 11), vec![4..6, 10..11]);
    }

    #[test]
    fn test_lanes_partition_rows() {
        let schedule = StaticSchedule::new(4, 3);
        let n_rows = 29;
        let mut seen = vec![0; n_rows];
        for lane in 0..schedule.n_threads() {
            for range in schedule.rows_for_lane(lane, n_rows) {
                for row in range {
                    seen[row] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_more_lanes_than_chunks() {
        let schedule = StaticSchedule::new(8, 100);
        assert_eq!(schedule.rows_for_lane(0, 10), vec![0..10]);
        assert!(schedule.rows_for_lane(5, 10).is_empty());
    }

    #[test]
    fn test_partition_matches_rows_for_lane() {
        let schedule = StaticSchedule::new(3, 4);
        let mut y = vec![0u8; 37];
        let partition = schedule.partition(&mut y);

        assert_eq!(partition.n_lanes(), 3);
        assert_eq!(partition.n_rows(), 37);
        for lane in 0..3 {
            assert_eq!(partition.lane_rows(lane), schedule.rows_for_lane(lane, 37));
        }
    }

    #[test]
    fn test_run_executes_round_robin_lanes() {
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let schedule = StaticSchedule::new(3, 2);
        let n_rows = 17;
        let mut owner = vec![usize::MAX; n_rows];
        let threads = Mutex::new(vec![Vec::new(); 3]);

        schedule
            .partition_by(n_rows, &mut owner, |row| row)
            .fill_rows(Some(&pool), |row| row, |lane, row, slot| {
                slot[0] = lane;
                threads.lock().unwrap()[lane].push((row, rayon::current_thread_index()));
            });

        for (row, &lane) in owner.iter().enumerate() {
            assert_eq!(lane, (row / 2) % 3, "row {row}");
        }
        // A lane is one task, so all of its rows run on one worker
        for rows in threads.into_inner().unwrap() {
            let first = rows[0].1;
            assert!(first.is_some());
            assert!(rows.iter().all(|&(_, thread)| thread == first));
        }
    }

    #[test]
    fn test_partition_reused_across_runs() {
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let schedule = StaticSchedule::new(2, 3);
        let mut y = vec![0usize; 11];

        let mut partition = schedule.partition(&mut y);
        for round in 1..=3 {
            partition.assign(&pool, |i| i * round);
        }
        drop(partition);

        assert_eq!(y, (0..11).map(|i| i * 3).collect::<Vec<_>>());
    }

    #[test]
    fn test_fill_rows_with_variable_widths() {
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let schedule = StaticSchedule::new(2, 1);
        // Rows own 1, 0, 3 and 2 slots
        let offsets = [0, 1, 1, 4, 6];
        let mut buf = vec![usize::MAX; 6];

        schedule
            .partition_by(4, &mut buf, |row| offsets[row])
            .fill_rows(Some(&pool), |row| offsets[row], |_, row, slots| slots.fill(row));

        assert_eq!(buf, vec![0, 2, 2, 2, 3, 3]);
    }

    #[test]
    fn test_init_rows_parallel_matches_sequential() {
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let schedule = StaticSchedule::new(3, 2);
        // Row r owns r % 3 slots
        let offsets: Vec<usize> = (0..=13).map(|r: usize| (0..r).map(|i| i % 3).sum()).collect();
        let value = |row: usize, slot: usize| row * 100 + slot;

        let parallel = schedule
            .try_init_rows("test", Some(&pool), 13, |r| offsets[r], value)
            .unwrap();
        let sequential = schedule
            .try_init_rows("test", None, 13, |r| offsets[r], value)
            .unwrap();

        assert_eq!(parallel.len(), offsets[13]);
        assert_eq!(parallel, sequential);
        for row in 0..13 {
            for slot in offsets[row]..offsets[row + 1] {
                assert_eq!(parallel[slot], row * 100 + slot);
            }
        }
    }

    #[test]
    fn test_init_rows_reports_allocation_failure() {
        let err = StaticSchedule::new(1, 1)
            .try_init_rows::<u64, _, _>("huge", None, 1, |r| r * (usize::MAX / 4), |_, _| 0)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::SpmvError::AllocationFailed { what: "huge", .. }
        ));
    }

    #[test]
    #[should_panic(expected = "cover the buffer")]
    fn test_partition_rejects_short_offsets() {
        let mut buf = vec![0u8; 5];
        StaticSchedule::new(2, 2).partition_by(2, &mut buf, |row| row * 2);
    }

    #[test]
    fn test_run_writes_every_row_once() {
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let schedule = StaticSchedule::new(3, 4);
        let mut y = vec![usize::MAX; 37];

        schedule.run(&pool, &mut y, |i| i * 2);

        let expected: Vec<usize> = (0..37).map(|i| i * 2).collect();
        assert_eq!(y, expected);
    }

    #[test]
    fn test_row_fn_called_once_per_row() {
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let schedule = StaticSchedule::new(2, 5);
        let visits = Mutex::new(Vec::new());
        let mut y = vec![0usize; 23];

        schedule.run(&pool, &mut y, |i| {
            visits.lock().unwrap().push(i);
            i
        });

        let mut visits = visits.into_inner().unwrap();
        visits.sort_unstable();
        assert_eq!(visits, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_on_empty_output() {
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let mut y: Vec<f64> = Vec::new();
        StaticSchedule::new(2, 8).run(&pool, &mut y, |_| 1.0);
        assert!(y.is_empty());
    }
}

//! Randomized, size-balanced partitioning of live connections into rooms.
//!
//! The algorithm is a Fisher–Yates shuffle followed by round-robin
//! assignment: the connection at shuffled position `i` lands in bucket
//! `i mod n`, so bucket sizes differ by at most one.
//!
//! The random source is a parameter. Production code goes through
//! [`RoomPartitioner`], which owns an entropy-seeded `StdRng`; tests pass a
//! seeded or mock RNG to get exact, reproducible buckets.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Partitioning failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// Requested room count cannot give every room two members.
    #[error("Cannot split {live} connections into {requested} rooms (max {max})")]
    InvalidRoomCount {
        requested: usize,
        live: usize,
        max: usize,
    },
}

/// Largest room count accepted for `live` connections: `ceil(live / 2)`.
pub fn max_room_count(live: usize) -> usize {
    (live + 1) / 2
}

/// Rejects `room_count` values outside `1..=max_room_count(live)`.
pub fn validate_room_count(room_count: usize, live: usize) -> Result<(), PartitionError> {
    let max = max_room_count(live);
    if room_count == 0 || room_count > max {
        return Err(PartitionError::InvalidRoomCount {
            requested: room_count,
            live,
            max,
        });
    }
    Ok(())
}

/// Unbiased in-place Fisher–Yates shuffle.
///
/// For `i` from the last index down to 1, swaps element `i` with a uniformly
/// chosen element in `[0, i]`. `gen_range` samples by rejection, so there is
/// no modulo bias.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Shuffles `items` and deals them into `room_count` buckets.
///
/// Pure: no I/O, and the input is consumed. Fails without producing any
/// bucket when `room_count` is zero or exceeds `ceil(len / 2)`.
pub fn partition<T, R: Rng + ?Sized>(
    mut items: Vec<T>,
    room_count: usize,
    rng: &mut R,
) -> Result<Vec<Vec<T>>, PartitionError> {
    validate_room_count(room_count, items.len())?;

    shuffle(&mut items, rng);

    let per_room = items.len() / room_count + 1;
    let mut buckets: Vec<Vec<T>> = (0..room_count)
        .map(|_| Vec::with_capacity(per_room))
        .collect();
    for (position, item) in items.into_iter().enumerate() {
        buckets[position % room_count].push(item);
    }
    Ok(buckets)
}

/// Owns the RNG used for breakout partitioning.
///
/// The lock is only held for the duration of one synchronous partition call.
pub struct RoomPartitioner {
    rng: Mutex<StdRng>,
}

impl RoomPartitioner {
    /// Partitioner seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic partitioner for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// See [`partition`].
    pub fn partition<T>(
        &self,
        items: Vec<T>,
        room_count: usize,
    ) -> Result<Vec<Vec<T>>, PartitionError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        partition(items, room_count, &mut *rng)
    }
}

impl Default for RoomPartitioner {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    fn sizes<T>(buckets: &[Vec<T>]) -> Vec<usize> {
        buckets.iter().map(Vec::len).collect()
    }

    #[test]
    fn max_room_count_is_half_rounded_up() {
        assert_eq!(max_room_count(0), 0);
        assert_eq!(max_room_count(1), 1);
        assert_eq!(max_room_count(7), 4);
        assert_eq!(max_room_count(8), 4);
    }

    #[test]
    fn eight_connections_into_three_rooms_gives_3_3_2() {
        let mut rng = StdRng::seed_from_u64(7);
        let buckets = partition((0..8).collect(), 3, &mut rng).unwrap();

        let mut got = sizes(&buckets);
        got.sort_unstable();
        assert_eq!(got, vec![2, 3, 3]);
    }

    #[test]
    fn zero_rooms_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = partition(vec![1, 2, 3], 0, &mut rng).unwrap_err();
        assert_eq!(
            err,
            PartitionError::InvalidRoomCount {
                requested: 0,
                live: 3,
                max: 2
            }
        );
    }

    #[test]
    fn too_many_rooms_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = partition(vec!['a', 'b', 'c', 'd'], 3, &mut rng);
        assert!(matches!(
            result,
            Err(PartitionError::InvalidRoomCount { requested: 3, live: 4, max: 2 })
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(partition(Vec::<u8>::new(), 1, &mut rng).is_err());
    }

    #[test]
    fn zero_rng_gives_exact_composition() {
        // A constant-zero source always picks j = 0, which rotates the
        // input left by one: [1, 2, 3, 4, 0].
        let mut rng = StepRng::new(0, 0);
        let buckets = partition(vec![0, 1, 2, 3, 4], 2, &mut rng).unwrap();

        assert_eq!(buckets, vec![vec![1, 3, 0], vec![2, 4]]);
    }

    #[test]
    fn same_seed_gives_same_buckets() {
        let a = RoomPartitioner::seeded(42).partition((0..20).collect::<Vec<_>>(), 4);
        let b = RoomPartitioner::seeded(42).partition((0..20).collect::<Vec<_>>(), 4);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn partitioner_from_seed_none_still_partitions() {
        let partitioner = RoomPartitioner::from_seed(None);
        let buckets = partitioner.partition((0..10).collect::<Vec<_>>(), 5).unwrap();
        assert_eq!(sizes(&buckets), vec![2; 5]);
    }

    #[test]
    fn shuffle_places_each_element_in_each_bucket_uniformly() {
        const ITEMS: usize = 6;
        const ROOMS: usize = 3;
        const TRIALS: usize = 30_000;

        let mut rng = StdRng::seed_from_u64(0xB0B);
        let mut counts = [[0usize; ROOMS]; ITEMS];

        for _ in 0..TRIALS {
            let buckets = partition((0..ITEMS).collect(), ROOMS, &mut rng).unwrap();
            for (room, bucket) in buckets.iter().enumerate() {
                for &item in bucket {
                    counts[item][room] += 1;
                }
            }
        }

        let expected = 1.0 / ROOMS as f64;
        for (item, per_room) in counts.iter().enumerate() {
            for (room, &count) in per_room.iter().enumerate() {
                let freq = count as f64 / TRIALS as f64;
                assert!(
                    (freq - expected).abs() < 0.02,
                    "item {} in room {} with frequency {:.4}",
                    item,
                    room,
                    freq
                );
            }
        }
    }

    #[test]
    fn shuffle_places_each_element_at_each_position_uniformly() {
        const ITEMS: usize = 5;
        const TRIALS: usize = 50_000;

        let mut rng = StdRng::seed_from_u64(99);
        let mut counts = [[0usize; ITEMS]; ITEMS];

        for _ in 0..TRIALS {
            let mut items: Vec<usize> = (0..ITEMS).collect();
            shuffle(&mut items, &mut rng);
            for (position, &item) in items.iter().enumerate() {
                counts[item][position] += 1;
            }
        }

        let expected = 1.0 / ITEMS as f64;
        for per_position in counts.iter() {
            for &count in per_position.iter() {
                let freq = count as f64 / TRIALS as f64;
                assert!((freq - expected).abs() < 0.015, "frequency {:.4}", freq);
            }
        }
    }

    proptest! {
        #[test]
        fn buckets_are_balanced_and_cover_input(
            live in 1usize..200,
            rooms_frac in 0.0f64..1.0,
            seed in any::<u64>(),
        ) {
            let max = max_room_count(live);
            let rooms = 1 + ((max - 1) as f64 * rooms_frac) as usize;
            let mut rng = StdRng::seed_from_u64(seed);

            let buckets = partition((0..live).collect::<Vec<_>>(), rooms, &mut rng).unwrap();

            prop_assert_eq!(buckets.len(), rooms);
            let lens = sizes(&buckets);
            let min = *lens.iter().min().unwrap();
            let max_len = *lens.iter().max().unwrap();
            prop_assert!(max_len - min <= 1);

            let flat: Vec<usize> = buckets.into_iter().flatten().collect();
            prop_assert_eq!(flat.len(), live);
            let unique: HashSet<usize> = flat.into_iter().collect();
            prop_assert_eq!(unique, (0..live).collect::<HashSet<_>>());
        }

        #[test]
        fn oversized_room_counts_are_rejected(
            live in 0usize..100,
            excess in 1usize..50,
            seed in any::<u64>(),
        ) {
            let rooms = max_room_count(live) + excess;
            let mut rng = StdRng::seed_from_u64(seed);
            let result = partition((0..live).collect::<Vec<_>>(), rooms, &mut rng);
            let is_invalid_count = matches!(result, Err(PartitionError::InvalidRoomCount { .. }));
            prop_assert!(is_invalid_count);
        }
    }
}

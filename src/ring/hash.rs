//! Placement hashing shared by worker registration and job routing.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a digest of `key`.
pub fn fnv1a32(key: &str) -> u32 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Map `key` onto a slot index in `[0, slots)`.
///
/// Worker addresses and job filenames share this address space, so absent
/// failures a job's primary slot is the slot its owner registered into.
pub fn placement(key: &str, slots: usize) -> usize {
    debug_assert!(slots > 0, "ring must have at least one slot");
    (fnv1a32(key) as u64 % slots as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a32_matches_reference_vectors() {
        assert_eq!(fnv1a32(""), 0x811c_9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c_292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn placement_is_stable_and_in_range() {
        for key in ["dead.txt", "lorem.txt", "piggy.txt", "10.0.0.4:9000", ""] {
            let first = placement(key, 12);
            assert!(first < 12);
            for _ in 0..16 {
                assert_eq!(placement(key, 12), first);
            }
        }
    }

    #[test]
    fn single_slot_ring_maps_everything_to_zero() {
        assert_eq!(placement("anything", 1), 0);
        assert_eq!(placement("else", 1), 0);
    }

    #[test]
    fn placement_spreads_keys() {
        let mut hits = [0usize; 8];
        for i in 0..800 {
            hits[placement(&format!("file-{i}.txt"), 8)] += 1;
        }
        assert!(hits.iter().all(|&h| h > 40), "skewed distribution: {hits:?}");
    }
}

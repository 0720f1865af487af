use crate::permutation::Permutation;

/// Largest number of sites a configuration can encode
pub const MAX_SITES: usize = 64;

/// One of the two substituent types a site can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Unmarked, bit cleared
    A,
    /// Marked, bit set
    B
}

/// Assignment of labels to sites, bit `i` set if site `i` carries [`Label::B`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Configuration(pub u64);

impl Configuration {
    /// Mark the passed sites
    ///
    /// ```
    /// # use orbitcount::configuration::Configuration;
    /// assert_eq!(Configuration::from_sites(&[0, 3]), Configuration(0b1001));
    /// ```
    ///
    /// # Panics
    /// If any site index is [`MAX_SITES`] or larger.
    pub fn from_sites(sites: &[usize]) -> Configuration {
        Configuration(sites.iter().fold(0, |bits, &i| {
            assert!(i < MAX_SITES, "Site {} exceeds the {} encodable sites", i, MAX_SITES);
            bits | (1u64 << i)
        }))
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn marked_count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_marked(self, site: usize) -> bool {
        site < MAX_SITES && (self.0 >> site) & 1 == 1
    }

    /// Ascending indices of marked sites
    pub fn sites(self) -> Vec<usize> {
        SetBits(self.0).collect()
    }

    /// Per-site labels of the first `n` sites
    pub fn labels(self, n: usize) -> Vec<Label> {
        (0..n).map(|i| if self.is_marked(i) { Label::B } else { Label::A }).collect()
    }

    /// Image under a site permutation
    ///
    /// Bit `i` of the image is set if and only if bit `p[i]` is set.
    pub fn permute(self, p: &Permutation) -> Configuration {
        let image = p.sigma.iter()
            .enumerate()
            .filter(|&(_, &j)| self.is_marked(j as usize))
            .fold(0, |bits, (i, _)| bits | (1u64 << i));
        Configuration(image)
    }

    /// Numerically smallest image under a set of permutations
    ///
    /// The configuration itself always competes, as if the identity were
    /// among the permutations.
    pub fn canonical(self, permutations: &[Permutation]) -> Configuration {
        permutations.iter()
            .map(|p| self.permute(p))
            .fold(self, Configuration::min)
    }
}

struct SetBits(u64);

impl Iterator for SetBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let i = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(i)
    }
}

/// Precomputed inverse tables for repeated canonicalization
///
/// Maps each set bit directly to its destination instead of scanning every
/// site per permutation, so the cost scales with the number of marked sites.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    inverses: Vec<Vec<u8>>
}

impl Canonicalizer {
    pub fn new(permutations: &[Permutation]) -> Canonicalizer {
        let inverses = permutations.iter()
            .filter(|p| !p.is_identity())
            .map(|p| p.inverse().sigma)
            .collect();
        Canonicalizer {inverses}
    }

    pub fn canonical(&self, configuration: Configuration) -> Configuration {
        let bits = configuration.0;
        let mut minimum = bits;
        for inverse in self.inverses.iter() {
            let image = SetBits(bits).fold(0u64, |image, j| image | (1u64 << inverse[j]));
            minimum = minimum.min(image);
        }
        Configuration(minimum)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use crate::configuration::*;
    use crate::sites;

    #[test]
    fn bit_encoding() {
        let c = Configuration::from_sites(&[1, 4, 5]);
        assert_eq!(c.bits(), 0b110010);
        assert_eq!(c.sites(), vec![1, 4, 5]);
        assert_eq!(c.marked_count(), 3);
        assert_eq!(c.labels(6), vec![Label::A, Label::B, Label::A, Label::A, Label::B, Label::B]);
        assert!(!c.is_marked(64));
        assert_eq!(Configuration::from_sites(&[63]).sites(), vec![63]);
    }

    #[test]
    #[should_panic]
    fn unencodable_site() {
        Configuration::from_sites(&[2, 64]);
    }

    #[test]
    fn permutation_action() {
        let p = Permutation::try_from(vec![1usize, 2, 0]).unwrap();
        // Image bit 2 reads input bit p[2] = 0
        assert_eq!(Configuration(0b001).permute(&p), Configuration(0b100));
        assert_eq!(Configuration(0b011).permute(&p), Configuration(0b101));

        let group = sites::d4h_group(&sites::first_sphere());
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let c = Configuration(rng.gen_range(0..(1u64 << 14)));
            assert_eq!(c.permute(&Permutation::identity(14)), c);
            for p in group.permutations() {
                let image = c.permute(p);
                assert_eq!(image.marked_count(), c.marked_count());
                assert_eq!(image.permute(&p.inverse()), c);
            }
        }
    }

    #[test]
    fn canonical_form() {
        let group = sites::d4h_group(&sites::reduced_sphere());
        let canonicalizer = Canonicalizer::new(group.permutations());
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let c = Configuration(rng.gen_range(0..256));
            let canonical = c.canonical(group.permutations());
            assert!(canonical <= c);
            assert_eq!(canonical.marked_count(), c.marked_count());
            // Idempotent
            assert_eq!(canonical.canonical(group.permutations()), canonical);
            // Same for every member of the orbit
            for p in group.permutations() {
                assert_eq!(c.permute(p).canonical(group.permutations()), canonical);
            }
            assert_eq!(canonicalizer.canonical(c), canonical);
        }

        // A single marked site always canonicalizes to site zero here
        assert_eq!(Configuration::from_sites(&[6]).canonical(group.permutations()), Configuration(1));
        assert_eq!(Configuration(0).canonical(&[]), Configuration(0));
    }
}

//! Endless batch sampler over a [`PosePairDataset`].
//!
//! Training draws batches indefinitely. The sampler walks the pair table in
//! consecutive blocks of `batch_size` pairs and, after a full pass, starts
//! over from the beginning, reshuffling the pairs first when configured.

use burn::tensor::backend::Backend;
use log::debug;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    dataset::{PosePairBatch, PosePairDataset},
    error::{DatasetError, DatasetResult},
};

pub struct PairSampler {
    dataset: PosePairDataset,
    rng: StdRng,
    current_batch: usize,
    batches_before_shuffle: usize,
}

impl PairSampler {
    /// Wrap `dataset`, shuffling the pairs once up front when configured.
    ///
    /// Fails when the pair table cannot fill a single batch.
    pub fn new(mut dataset: PosePairDataset) -> DatasetResult<Self> {
        let pairs = dataset.pairs().len();
        let batch_size = dataset.config().batch_size;
        let batches_before_shuffle = pairs / batch_size;
        if batches_before_shuffle == 0 {
            return Err(DatasetError::NotEnoughPairs { pairs, batch_size });
        }

        let mut rng = StdRng::seed_from_u64(dataset.config().seed);
        if dataset.config().shuffle {
            dataset.pairs_mut().shuffle(&mut rng);
        }

        Ok(Self {
            dataset,
            rng,
            current_batch: 0,
            batches_before_shuffle,
        })
    }

    pub fn dataset(&self) -> &PosePairDataset {
        &self.dataset
    }

    /// Nominal epoch length, independent of the number of pairs.
    pub fn number_of_batches_per_epoch(&self) -> usize {
        self.dataset.config().batches_per_epoch
    }

    /// Pair indices of the next batch.
    ///
    /// Trailing pairs that do not fill a batch are skipped on each pass.
    pub fn next_data_index(&mut self) -> Vec<usize> {
        if self.current_batch == self.batches_before_shuffle {
            self.current_batch = 0;
            if self.dataset.config().shuffle {
                debug!("Reshuffling {} pairs", self.dataset.pairs().len());
                self.dataset.pairs_mut().shuffle(&mut self.rng);
            }
        }

        let batch_size = self.dataset.config().batch_size;
        let start = self.current_batch * batch_size;
        self.current_batch += 1;
        (start..start + batch_size).collect()
    }

    /// Next batch for the generator.
    pub fn next_generator_sample<B: Backend>(
        &mut self,
        device: &B::Device,
    ) -> DatasetResult<PosePairBatch<B>> {
        let indices = self.next_data_index();
        self.dataset.load_batch(&indices, false, device)
    }

    /// Next batch for the discriminator; carries warps only for a
    /// warp-conditioned discriminator.
    pub fn next_discriminator_sample<B: Backend>(
        &mut self,
        device: &B::Device,
    ) -> DatasetResult<PosePairBatch<B>> {
        let indices = self.next_data_index();
        self.dataset.load_batch(&indices, true, device)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::tests::{fixture, TestBackend};

    #[test]
    fn cycles_through_full_batches() {
        let fixture = fixture();
        let config = fixture.config().with_shuffle(false);
        let mut sampler = PairSampler::new(PosePairDataset::new(config).unwrap()).unwrap();

        assert_eq!(sampler.next_data_index(), vec![0, 1]);
        assert_eq!(sampler.next_data_index(), vec![2, 3]);
        assert_eq!(sampler.next_data_index(), vec![0, 1]);
    }

    #[test]
    fn trailing_pairs_are_skipped() {
        let fixture = fixture();
        let config = fixture.config().with_shuffle(false).with_batch_size(3);
        let mut sampler = PairSampler::new(PosePairDataset::new(config).unwrap()).unwrap();

        assert_eq!(sampler.next_data_index(), vec![0, 1, 2]);
        assert_eq!(sampler.next_data_index(), vec![0, 1, 2]);
    }

    #[test]
    fn too_few_pairs_is_an_error() {
        let fixture = fixture();
        let config = fixture.config().with_batch_size(5);

        match PairSampler::new(PosePairDataset::new(config).unwrap()) {
            Err(DatasetError::NotEnoughPairs { pairs, batch_size }) => {
                assert_eq!((pairs, batch_size), (4, 5));
            }
            Err(e) => panic!("Expected NotEnoughPairs error, got {e:?}"),
            Ok(_) => panic!("Expected NotEnoughPairs error"),
        }
    }

    #[test]
    fn shuffle_keeps_every_pair() {
        let fixture = fixture();
        let sampler = PairSampler::new(PosePairDataset::new(fixture.config()).unwrap()).unwrap();

        let shuffled: HashSet<_> = sampler.dataset().pairs().iter().cloned().collect();
        let unshuffled: HashSet<_> = PosePairDataset::new(fixture.config())
            .unwrap()
            .pairs()
            .iter()
            .cloned()
            .collect();
        assert_eq!(shuffled, unshuffled);
    }

    #[test]
    fn same_seed_same_order() {
        let fixture = fixture();
        let order = |seed| {
            let config = fixture.config().with_seed(seed);
            let sampler = PairSampler::new(PosePairDataset::new(config).unwrap()).unwrap();
            sampler.dataset().pairs().iter().cloned().collect::<Vec<_>>()
        };

        assert_eq!(order(3), order(3));
    }

    #[test]
    fn wrap_reshuffles_with_seed() {
        let fixture = fixture();
        let pair_order = |sampler: &PairSampler| {
            sampler.dataset().pairs().iter().cloned().collect::<Vec<_>>()
        };
        let run = || {
            let mut sampler =
                PairSampler::new(PosePairDataset::new(fixture.config()).unwrap()).unwrap();
            let initial = pair_order(&sampler);
            // Four pairs in batches of two: the third draw wraps.
            sampler.next_data_index();
            sampler.next_data_index();
            assert_eq!(pair_order(&sampler), initial);
            assert_eq!(sampler.next_data_index(), vec![0, 1]);
            (initial, pair_order(&sampler))
        };

        let (initial, reshuffled) = run();
        assert_ne!(reshuffled, initial);
        assert_eq!(run(), (initial, reshuffled));
    }

    #[test]
    fn samples_have_batch_shape() {
        let fixture = fixture();
        // The first two pairs are fully on disk.
        let config = fixture.config().with_shuffle(false);
        let mut sampler = PairSampler::new(PosePairDataset::new(config).unwrap()).unwrap();
        let device = Default::default();

        let generator = sampler.next_generator_sample::<TestBackend>(&device).unwrap();
        assert_eq!(generator.from_images.dims(), [2, 3, 16, 8]);
        assert_eq!(generator.tensor_count(), 6);

        // Pairs 2 and 3 follow; pair 3 names an image missing from disk.
        assert!(sampler
            .next_discriminator_sample::<TestBackend>(&device)
            .is_err());

        let discriminator = sampler
            .next_discriminator_sample::<TestBackend>(&device)
            .unwrap();
        assert_eq!(discriminator.tensor_count(), 4);
    }

    #[test]
    fn epoch_length_comes_from_config() {
        let fixture = fixture();
        let config = fixture.config().with_batches_per_epoch(25);
        let sampler = PairSampler::new(PosePairDataset::new(config).unwrap()).unwrap();

        assert_eq!(sampler.number_of_batches_per_epoch(), 25);
    }
}

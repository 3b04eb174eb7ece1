//! Merge of two time-ordered deposition streams.

use lib_types::DepoRef;
use std::iter::{Fuse, Peekable};

/// Depositions taken from each input and handed out so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub first: usize,
    pub second: usize,
    pub emitted: usize,
}

/// Interleaves two streams, each in ascending time order, into one.
///
/// The earlier deposition goes first. On equal times the first stream's
/// deposition goes first and the second's follows on the next call. Once
/// one stream ends the rest of the other passes through.
pub struct DepoMerger<A: Iterator, B: Iterator> {
    first: Peekable<Fuse<A>>,
    second: Peekable<Fuse<B>>,
    stats: MergeStats,
    done: bool,
}

impl<A, B> DepoMerger<A, B>
where
    A: Iterator<Item = DepoRef>,
    B: Iterator<Item = DepoRef>,
{
    pub fn new<I, J>(first: I, second: J) -> Self
    where
        I: IntoIterator<IntoIter = A>,
        J: IntoIterator<IntoIter = B>,
    {
        Self {
            first: first.into_iter().fuse().peekable(),
            second: second.into_iter().fuse().peekable(),
            stats: MergeStats::default(),
            done: false,
        }
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }
}

impl<A, B> Iterator for DepoMerger<A, B>
where
    A: Iterator<Item = DepoRef>,
    B: Iterator<Item = DepoRef>,
{
    type Item = DepoRef;

    fn next(&mut self) -> Option<DepoRef> {
        let take_first = match (self.first.peek(), self.second.peek()) {
            (Some(a), Some(b)) => a.time() <= b.time(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => {
                if !self.done {
                    self.done = true;
                    tracing::debug!(
                        first = self.stats.first,
                        second = self.stats.second,
                        emitted = self.stats.emitted,
                        "depo merge complete"
                    );
                }
                return None;
            }
        };

        let depo = if take_first {
            self.stats.first += 1;
            self.first.next()
        } else {
            self.stats.second += 1;
            self.second.next()
        };
        if depo.is_some() {
            self.stats.emitted += 1;
        }
        depo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::{Depo, Point};

    fn stream(times: &[f64], charge: f64) -> Vec<DepoRef> {
        times
            .iter()
            .map(|&t| Depo::new(t, Point::ORIGIN, charge).into_ref())
            .collect()
    }

    #[test]
    fn test_interleaves_by_time() {
        let a = stream(&[1.0, 4.0, 5.0, 9.0], 1.0);
        let b = stream(&[2.0, 3.0, 8.0], 2.0);
        let mut merger = DepoMerger::new(a, b);
        let times: Vec<f64> = merger.by_ref().map(|d| d.time()).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0]);
        assert_eq!(
            merger.stats(),
            MergeStats {
                first: 4,
                second: 3,
                emitted: 7
            }
        );
        assert!(merger.next().is_none());
    }

    #[test]
    fn test_ties_keep_both_first_stream_leading() {
        let a = stream(&[1.0, 2.0], 1.0);
        let b = stream(&[2.0, 2.0], 2.0);
        let charges: Vec<f64> = DepoMerger::new(a, b).map(|d| d.charge()).collect();
        assert_eq!(charges, vec![1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_one_empty_stream() {
        let a = stream(&[], 1.0);
        let b = stream(&[3.0, 6.0], 2.0);
        let mut merger = DepoMerger::new(a, b);
        assert_eq!(merger.by_ref().count(), 2);
        assert_eq!(merger.stats().first, 0);
        assert_eq!(merger.stats().second, 2);
    }

    #[test]
    fn test_merges_blips_with_a_bounded_stream() {
        use crate::blips::BlipSource;
        use crate::random::StdRandom;
        use lib_types::{units, Ray};

        let blips = BlipSource::new(
            100.0,
            0.0,
            1.0 * units::MHZ,
            Ray::new(Point::ORIGIN, Point::new(1.0, 1.0, 1.0)),
            Box::new(StdRandom::seeded(3)),
        )
        .unwrap()
        .take_while(|d| d.time() < 50.0 * units::US);
        let track = stream(&[10.0 * units::US, 20.0 * units::US], -1.0);

        let merged: Vec<DepoRef> = DepoMerger::new(blips, track).collect();
        assert!(merged.windows(2).all(|w| w[0].time() <= w[1].time()));
        assert_eq!(merged.iter().filter(|d| d.charge() < 0.0).count(), 2);
        assert!(merged.len() > 20);
    }
}

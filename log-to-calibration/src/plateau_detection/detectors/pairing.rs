use super::{Direction, Transition};
use tracing::{debug, warn};

/// Fewer matched pairs than this suggests the acquisition did not cover a
/// full test profile; processing continues but the run is flagged.
const EXPECTED_MINIMUM_PAIRS: usize = 5;

/// A candidate stable segment, bounded by a rising and a falling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Plateau {
    pub(crate) rising: usize,
    pub(crate) falling: usize,
}

impl Plateau {
    pub(crate) fn len(&self) -> usize {
        self.falling - self.rising
    }
}

/// Matches rising and falling edges into plateaus.
///
/// Falling edges which precede the first rising edge are dropped. When the
/// trace ends with one more rising edge than falling (the last segment was
/// still flat when acquisition stopped), a falling edge is backfilled at the
/// final sample rather than discarding the segment; any remaining excess is
/// truncated to the shorter list.
pub(crate) fn pair_plateaus(transitions: &[Transition], trace_length: usize) -> Vec<Plateau> {
    let mut rising: Vec<usize> = transitions
        .iter()
        .filter(|transition| transition.direction == Direction::Rising)
        .map(|transition| transition.index)
        .collect();
    let mut falling: Vec<usize> = transitions
        .iter()
        .filter(|transition| transition.direction == Direction::Falling)
        .map(|transition| transition.index)
        .collect();

    while let (Some(&first_rising), Some(&first_falling)) = (rising.first(), falling.first()) {
        if first_rising >= first_falling {
            debug!("Dropping falling edge at sample {first_falling} which precedes the first rising edge");
            falling.remove(0);
        } else {
            break;
        }
    }

    if rising.len() == falling.len() + 1 && trace_length > 0 {
        debug!("Backfilling a falling edge at the end of the trace");
        falling.push(trace_length - 1);
    }

    let pairs = rising.len().min(falling.len());
    rising.truncate(pairs);
    falling.truncate(pairs);

    if pairs < EXPECTED_MINIMUM_PAIRS {
        warn!("Only {pairs} plateau pairs found, expected at least {EXPECTED_MINIMUM_PAIRS}");
    }

    rising
        .into_iter()
        .zip(falling)
        .filter(|(rising, falling)| falling > rising)
        .map(|(rising, falling)| Plateau { rising, falling })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(index: usize) -> Transition {
        Transition {
            index,
            direction: Direction::Rising,
        }
    }

    fn falling(index: usize) -> Transition {
        Transition {
            index,
            direction: Direction::Falling,
        }
    }

    #[test]
    fn alternating_edges_pair_up() {
        let transitions = [rising(10), falling(50), rising(70), falling(120)];
        assert_eq!(
            pair_plateaus(&transitions, 200),
            vec![
                Plateau {
                    rising: 10,
                    falling: 50
                },
                Plateau {
                    rising: 70,
                    falling: 120
                },
            ]
        );
    }

    #[test]
    fn leading_falling_edge_is_dropped() {
        let transitions = [falling(5), rising(10), falling(50)];
        assert_eq!(
            pair_plateaus(&transitions, 100),
            vec![Plateau {
                rising: 10,
                falling: 50
            }]
        );
    }

    #[test]
    fn trailing_rising_edge_is_closed_at_the_end_of_the_trace() {
        let transitions = [rising(10), falling(50), rising(70)];
        assert_eq!(
            pair_plateaus(&transitions, 100),
            vec![
                Plateau {
                    rising: 10,
                    falling: 50
                },
                Plateau {
                    rising: 70,
                    falling: 99
                },
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_plateaus() {
        assert_eq!(pair_plateaus(&[], 100), vec![]);
    }
}

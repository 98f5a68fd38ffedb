use super::Detector;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Rising,
    Falling,
}

/// A registered level crossing in the thresholded flat/transition trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) index: usize,
    pub(crate) direction: Direction,
}

#[derive(Clone)]
struct LevelState {
    current_level: bool,
    last_edge_index: usize,
}

/// Debounced level-crossing state machine. A crossing registers only if it
/// arrives more than `minimum_spacing` samples after the previous registered
/// edge; shorter-lived excursions are discarded as spurious and leave the
/// tracked level unchanged.
///
/// A trace which begins at the flat level opens with a rising edge at index
/// zero, so a plateau already underway when acquisition started is bounded
/// like any other.
#[derive(Clone)]
pub(crate) struct LevelCrossingDetector {
    minimum_spacing: usize,
    state: Option<LevelState>,
}

impl LevelCrossingDetector {
    pub(crate) fn new(minimum_spacing: usize) -> Self {
        Self {
            minimum_spacing,
            state: None,
        }
    }
}

impl Detector for LevelCrossingDetector {
    type InputType = bool;
    type EventType = Transition;

    fn signal(&mut self, index: usize, level: bool) -> Option<Transition> {
        match self.state.as_mut() {
            None => {
                self.state = Some(LevelState {
                    current_level: level,
                    last_edge_index: 0,
                });
                level.then_some(Transition {
                    index,
                    direction: Direction::Rising,
                })
            }
            Some(state) => {
                if level == state.current_level {
                    return None;
                }
                if index - state.last_edge_index > self.minimum_spacing {
                    state.current_level = level;
                    state.last_edge_index = index;
                    Some(Transition {
                        index,
                        direction: if level {
                            Direction::Rising
                        } else {
                            Direction::Falling
                        },
                    })
                } else {
                    debug!(
                        "Discarding spurious transition at sample {index}, only {} after the previous edge",
                        index - state.last_edge_index
                    );
                    None
                }
            }
        }
    }
}

/// Rebuilds the debounce-cleaned binary trace from the registered edges;
/// suppressed transitions are invisible in the result.
pub(crate) fn cleaned_levels(length: usize, transitions: &[Transition]) -> Vec<bool> {
    let mut levels = vec![false; length];
    let mut transitions = transitions.iter().peekable();
    let mut level = false;
    for (index, entry) in levels.iter_mut().enumerate() {
        if let Some(transition) = transitions.peek() {
            if transition.index == index {
                level = transition.direction == Direction::Rising;
                transitions.next();
            }
        }
        *entry = level;
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::{super::EventFilter, *};

    fn detect(levels: &[u8], minimum_spacing: usize) -> Vec<Transition> {
        levels
            .iter()
            .map(|level| *level != 0)
            .events(LevelCrossingDetector::new(minimum_spacing))
            .collect()
    }

    #[test]
    fn well_separated_edges_register_at_the_correct_indices() {
        let levels = [0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0];
        assert_eq!(
            detect(&levels, 2),
            vec![
                Transition {
                    index: 3,
                    direction: Direction::Rising
                },
                Transition {
                    index: 9,
                    direction: Direction::Falling
                },
            ]
        );
    }

    #[test]
    fn transitions_within_the_debounce_window_are_suppressed() {
        // Both the excursion to 1 and the return to 0 arrive within the
        // debounce spacing, so the level never changes.
        let levels = [0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(detect(&levels, 4), vec![]);
    }

    #[test]
    fn initially_flat_trace_opens_with_a_rising_edge() {
        let levels = [1, 1, 1, 1, 1, 1, 0, 0, 0];
        assert_eq!(
            detect(&levels, 2),
            vec![
                Transition {
                    index: 0,
                    direction: Direction::Rising
                },
                Transition {
                    index: 6,
                    direction: Direction::Falling
                },
            ]
        );
    }

    #[test]
    fn opposite_edges_keep_the_minimum_spacing() {
        // The return to 0 at index 7 is only 2 samples after the rising
        // edge at 5, so it is deferred until the spacing has elapsed.
        let levels = [0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0];
        assert_eq!(
            detect(&levels, 3),
            vec![
                Transition {
                    index: 5,
                    direction: Direction::Rising
                },
                Transition {
                    index: 9,
                    direction: Direction::Falling
                },
            ]
        );
    }

    #[test]
    fn cleaned_trace_hides_suppressed_transitions() {
        let levels = [0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        let transitions = detect(&levels, 4);
        let cleaned = cleaned_levels(levels.len(), &transitions);
        assert_eq!(cleaned, vec![false; levels.len()]);
    }

    #[test]
    fn cleaned_trace_follows_registered_edges() {
        let levels = [0, 0, 1, 1, 1, 1, 1, 0, 0, 0];
        let transitions = detect(&levels, 1);
        let cleaned = cleaned_levels(levels.len(), &transitions);
        assert_eq!(
            cleaned,
            vec![false, false, true, true, true, true, true, false, false, false]
        );
    }
}

pub(crate) mod level_crossing;
pub(crate) mod pairing;

pub(crate) use level_crossing::{cleaned_levels, Direction, LevelCrossingDetector, Transition};
pub(crate) use pairing::{pair_plateaus, Plateau};

/// A stateful scanner which inspects each sample in turn and occasionally
/// emits an event. The index of the sample within the trace is supplied
/// alongside its value.
pub(crate) trait Detector: Clone {
    type InputType: Copy;
    type EventType;

    fn signal(&mut self, index: usize, value: Self::InputType) -> Option<Self::EventType>;
}

#[derive(Clone)]
pub(crate) struct EventIter<I, D>
where
    I: Iterator<Item = D::InputType>,
    D: Detector,
{
    source: I,
    detector: D,
    index: usize,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = D::InputType>,
    D: Detector,
{
    type Item = D::EventType;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let value = self.source.next()?;
            let index = self.index;
            self.index += 1;
            if let Some(event) = self.detector.signal(index, value) {
                return Some(event);
            }
        }
    }
}

pub(crate) trait EventFilter<I, D>
where
    I: Iterator<Item = D::InputType>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = D::InputType>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
            index: 0,
        }
    }
}

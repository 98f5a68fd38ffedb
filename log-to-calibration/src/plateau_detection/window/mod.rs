pub(crate) mod finite_difference;
pub(crate) mod two_pole;

pub(crate) use finite_difference::FiniteDifference;
pub(crate) use two_pole::{fill_forward, TwoPoleFilter};

/// A stateful per-sample transform. Every filter in this pipeline emits
/// exactly one output per input, so a filtered series always has the same
/// length as (and stays index-aligned with) its source.
pub(crate) trait Window: Clone {
    type InputType: Copy;
    type OutputType;

    fn push(&mut self, value: Self::InputType) -> Self::OutputType;
}

#[derive(Clone)]
pub(crate) struct WindowIter<I, W>
where
    I: Iterator,
    I::Item: Copy,
    W: Window<InputType = I::Item>,
{
    window_function: W,
    source: I,
}

impl<I, W> Iterator for WindowIter<I, W>
where
    I: Iterator,
    I::Item: Copy,
    W: Window<InputType = I::Item>,
{
    type Item = W::OutputType;

    fn next(&mut self) -> Option<Self::Item> {
        self.source
            .next()
            .map(|value| self.window_function.push(value))
    }
}

pub(crate) trait WindowFilter<I, W>
where
    I: Iterator,
    I::Item: Copy,
    W: Window<InputType = I::Item>,
{
    fn window(self, window_function: W) -> WindowIter<I, W>;
}

impl<I, W> WindowFilter<I, W> for I
where
    I: Iterator,
    I::Item: Copy,
    W: Window<InputType = I::Item>,
{
    fn window(self, window_function: W) -> WindowIter<I, W> {
        WindowIter {
            window_function,
            source: self,
        }
    }
}

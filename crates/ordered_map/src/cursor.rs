use std::iter::FusedIterator;

/// Bidirectional cursor over the records of a tree.
///
/// A cursor starts on the first (`cursor_front`) or last (`cursor_back`)
/// record. Stepping past either edge leaves it at the end, where `current`
/// returns `None` and further moves are no-ops.
pub trait RecordCursor<'a> {
    fn current(&self) -> Option<&'a [u8]>;

    fn move_next(&mut self);

    fn move_prev(&mut self);

    fn at_end(&self) -> bool {
        self.current().is_none()
    }
}

/// Double-ended iterator built from a front and a back cursor.
pub struct Iter<'a, C: RecordCursor<'a>> {
    front: C,
    back: C,
    remaining: usize,
    _marker: std::marker::PhantomData<&'a [u8]>,
}

impl<'a, C: RecordCursor<'a>> Iter<'a, C> {
    pub(crate) fn new(front: C, back: C, len: usize) -> Self {
        Self {
            front,
            back,
            remaining: len,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, C: RecordCursor<'a>> Iterator for Iter<'a, C> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let record = self.front.current()?;
        self.front.move_next();
        self.remaining -= 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, C: RecordCursor<'a>> DoubleEndedIterator for Iter<'a, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let record = self.back.current()?;
        self.back.move_prev();
        self.remaining -= 1;
        Some(record)
    }
}

impl<'a, C: RecordCursor<'a>> ExactSizeIterator for Iter<'a, C> {}

impl<'a, C: RecordCursor<'a>> FusedIterator for Iter<'a, C> {}

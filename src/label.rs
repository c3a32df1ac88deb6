/// A branch label. Labels are unique among the live items of one [`BranchTree`](crate::BranchTree).
pub type Label = u32;

/// Hands out labels `1..=max`, lowest first, reusing released labels most recent first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabelAllocator {
    next: Label,
    max: Label,
    free: Vec<Label>,
}

impl Default for LabelAllocator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl LabelAllocator {
    pub const DEFAULT_MAX: Label = 60_000;

    pub fn new(max: Label) -> Self {
        Self {
            next: 1,
            max,
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn max(&self) -> Label {
        self.max
    }

    /// Returns `None` once all labels are in use.
    pub fn allocate(&mut self) -> Option<Label> {
        if let Some(label) = self.free.pop() {
            return Some(label);
        }
        if self.next > self.max {
            return None;
        }
        let label = self.next;
        self.next += 1;
        Some(label)
    }

    /// Returns `label` to the pool. Releasing a label that is not in use does nothing.
    pub fn release(&mut self, label: Label) {
        if self.in_use(label) {
            self.free.push(label);
        }
    }

    #[inline]
    pub fn is_available(&self, label: Label) -> bool {
        (1..=self.max).contains(&label) && (label >= self.next || self.free.contains(&label))
    }

    #[inline]
    pub fn in_use(&self, label: Label) -> bool {
        (1..=self.max).contains(&label) && !self.is_available(label)
    }

    /// Number of labels currently handed out.
    #[inline]
    pub fn num_in_use(&self) -> usize {
        (self.next - 1) as usize - self.free.len()
    }

    /// Takes every label back.
    pub fn reset(&mut self) {
        self.next = 1;
        self.free.clear();
    }
}

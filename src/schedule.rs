/*
 * Schedule Module
 *
 * Chooses between sequential and rayon fan-out execution for the two
 * data-parallel passes (flocking and vertex emission). The choice is made
 * when the population changes, not every tick.
 */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Sequential,
    Parallel,
}

impl Schedule {
    pub fn for_population(count: usize, threshold: usize) -> Self {
        if count >= threshold.max(1) {
            Schedule::Parallel
        } else {
            Schedule::Sequential
        }
    }

    // Minimum items per rayon task, one contiguous run per worker thread
    pub fn chunk_size(self, len: usize) -> usize {
        match self {
            Schedule::Sequential => len.max(1),
            Schedule::Parallel => (len / rayon::current_num_threads()).max(1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Schedule::Sequential => "sequential",
            Schedule::Parallel => "parallel",
        }
    }
}

//! Work scheduling.
//!
//! Tasks run in waves: a wave of at most `maxthreads` workers is spawned,
//! joined, the progress bar advances, and the next wave starts. With no
//! thread bound every task gets its own thread in a single wave. Workers
//! never share state; each owns its task exclusively for the duration of
//! the wave.

use indicatif::{ProgressBar, ProgressStyle};

/// How tasks are mapped onto threads.
#[derive(Copy, Clone, Debug)]
pub enum Pool {
    /// Run every task inline on the calling thread.
    Serial,

    /// One thread per task, all joined at once.
    Unbounded,

    /// Waves of at most this many threads.
    Bounded(usize),
}

impl Pool {
    /// Derives the pool from the `maxthreads` setting; absent or
    /// non-positive values mean unbounded fan-out.
    ///
    /// * `maxthreads` - The setting value, when present.
    pub fn from_setting(maxthreads: Option<i32>) -> Self {
        match maxthreads {
            Some(n) if n >= 1 => Pool::Bounded(n as usize),
            _ => Pool::Unbounded,
        }
    }

    /// Runs all tasks to completion, advancing the progress bar as tasks
    /// finish. A panicking worker takes the engine down with it.
    ///
    /// * `tasks`    - The tasks.
    /// * `progress` - Progress bar advanced once per task.
    /// * `f`        - The work performed per task.
    pub fn run<T, F>(&self, tasks: &mut [T], progress: &ProgressBar, f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        let f = &f;
        match self {
            Pool::Serial => {
                for task in tasks.iter_mut() {
                    f(task);
                    progress.inc(1);
                }
            }
            Pool::Unbounded => Self::wave(tasks, progress, f),
            Pool::Bounded(n) => {
                for wave in tasks.chunks_mut(*n) {
                    Self::wave(wave, progress, f);
                }
            }
        }
    }

    fn wave<T, F>(tasks: &mut [T], progress: &ProgressBar, f: &F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        crossbeam::scope(|scope| {
            for task in tasks.iter_mut() {
                scope.spawn(move |_| {
                    f(task);
                    progress.inc(1);
                });
            }
        })
        .unwrap();
    }
}

/// Creates the progress reporter used between waves.
///
/// * `len` - Total number of tasks.
/// * `msg` - Message shown next to the bar.
pub fn create_progress_reporter(len: u64, msg: &'static str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{msg:25.cyan.bold} [{bar:40.green/white}] {pos:>5}/{len:5} ({elapsed}|{eta})")
        .unwrap()
        .progress_chars("█▓▒░  ");
    let pb = ProgressBar::new(len);
    pb.set_style(style);
    pb.set_message(msg);
    pb
}

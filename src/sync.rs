// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// A counting semaphore.
///
/// Waiting for a permit never requires any other lock to be held.
#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    released_condition: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            released_condition: Condvar::new(),
        }
    }

    /// Takes a permit, waiting until one becomes available.
    ///
    /// Returns `false` if `deadline` passed before a permit could be taken.
    /// Without deadline, this waits forever.
    pub(crate) fn acquire(&self, deadline: Option<Instant>) -> bool {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            match deadline {
                None => self.released_condition.wait(&mut permits),
                Some(deadline) => {
                    if self
                        .released_condition
                        .wait_until(&mut permits, deadline)
                        .timed_out()
                        && *permits == 0
                    {
                        return false;
                    }
                }
            }
        }
        *permits -= 1;
        true
    }

    pub(crate) fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    pub(crate) fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.released_condition.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        *self.permits.lock()
    }
}

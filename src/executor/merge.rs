// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fan-in of several channels of the same element type.

use tokio::sync::mpsc;

/// Merge `inputs` into a single receiver.
///
/// One forwarding task is spawned per input, each holding its own clone of
/// the output sender. The output therefore closes exactly once, after the
/// last input has closed and been fully relayed. Ordering within one input
/// is preserved; ordering across inputs is whatever arrives first.
pub fn merge<T, I>(inputs: I) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = mpsc::Receiver<T>>,
{
    let (tx, rx) = mpsc::channel(1);

    for mut input in inputs {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(item) = input.recv().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
    }

    // Only the forwarders keep the output open from here on
    drop(tx);
    rx
}

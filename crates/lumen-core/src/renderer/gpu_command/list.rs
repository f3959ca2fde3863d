// Copyright 2025 eraflo
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

//! The ordered buffer of commands waiting to be serialized.

use super::command::{Command, IntPacking, COMMAND_STRIDE_BYTES};
use std::collections::VecDeque;

/// An ordered, single-producer buffer of pending [`Command`]s.
///
/// Insertion order is enqueue order and is preserved by every operation: the
/// list only grows at the back, and only shrinks by removing the prefix that
/// was written out. Growth is unbounded; the owning queue is expected to drain
/// it every frame.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: VecDeque<Command>,
    packing: IntPacking,
}

impl CommandList {
    /// Creates an empty list that encodes integers with `packing`.
    pub fn new(packing: IntPacking) -> Self {
        Self {
            commands: VecDeque::new(),
            packing,
        }
    }

    /// Appends a command at the back of the list.
    #[inline]
    pub fn append(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Returns the number of pending commands.
    #[inline]
    pub fn depth(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The integer packing used when encoding.
    pub fn packing(&self) -> IntPacking {
        self.packing
    }

    /// Iterates over the pending commands in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Encodes up to `max_count` commands from the front of the list into
    /// `sink`, starting at offset 0, without removing them.
    ///
    /// Only whole slots that fit in `sink` are written. Returns the number of
    /// commands encoded.
    pub fn encode_front(&self, max_count: usize, sink: &mut [u8]) -> usize {
        let fits = sink.len() / COMMAND_STRIDE_BYTES;
        let count = max_count.min(fits).min(self.commands.len());

        for (command, slot) in self
            .commands
            .iter()
            .take(count)
            .zip(sink.chunks_exact_mut(COMMAND_STRIDE_BYTES))
        {
            command.encode_into(slot, self.packing);
        }

        count
    }

    /// Removes up to `count` commands from the front of the list.
    pub fn discard_front(&mut self, count: usize) {
        let count = count.min(self.commands.len());
        self.commands.drain(..count);
    }

    /// Removes up to `max_count` commands from the front of the list, writing
    /// each one's encoded form into consecutive slots of `sink`.
    ///
    /// Returns `min(max_count, depth)` (further limited by the slots that fit
    /// in `sink`). Remaining commands stay queued in order.
    pub fn drain_up_to(&mut self, max_count: usize, sink: &mut [u8]) -> usize {
        let written = self.encode_front(max_count, sink);
        self.discard_front(written);
        written
    }
}

impl Extend<Command> for CommandList {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.commands.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remove(slot: u32) -> Command {
        Command::RemoveLight { slot }
    }

    fn decode_slot(sink: &[u8], index: usize) -> Command {
        let start = index * COMMAND_STRIDE_BYTES;
        Command::decode(&sink[start..start + COMMAND_STRIDE_BYTES], IntPacking::BitCast).unwrap()
    }

    #[test]
    fn test_append_grows_depth() {
        let mut list = CommandList::new(IntPacking::BitCast);
        assert!(list.is_empty());
        list.append(remove(1));
        list.append(remove(2));
        assert_eq!(list.depth(), 2);
    }

    #[test]
    fn test_drain_everything_when_under_cap() {
        let mut list = CommandList::new(IntPacking::BitCast);
        for slot in 0..3 {
            list.append(remove(slot));
        }

        let mut sink = vec![0u8; 8 * COMMAND_STRIDE_BYTES];
        assert_eq!(list.drain_up_to(8, &mut sink), 3);
        assert!(list.is_empty());
        for slot in 0..3 {
            assert_eq!(decode_slot(&sink, slot as usize), remove(slot));
        }
    }

    #[test]
    fn test_partial_drain_keeps_remainder_in_order() {
        let mut list = CommandList::new(IntPacking::BitCast);
        for slot in 0..5 {
            list.append(remove(slot));
        }

        let mut sink = vec![0u8; 2 * COMMAND_STRIDE_BYTES];
        assert_eq!(list.drain_up_to(2, &mut sink), 2);
        assert_eq!(decode_slot(&sink, 0), remove(0));
        assert_eq!(decode_slot(&sink, 1), remove(1));

        let remaining: Vec<_> = list.iter().copied().collect();
        assert_eq!(remaining, vec![remove(2), remove(3), remove(4)]);
    }

    #[test]
    fn test_empty_drain_writes_nothing() {
        let mut list = CommandList::new(IntPacking::BitCast);
        let mut sink = vec![0x5Au8; 4 * COMMAND_STRIDE_BYTES];
        assert_eq!(list.drain_up_to(4, &mut sink), 0);
        assert!(sink.iter().all(|b| *b == 0x5A));
    }

    #[test]
    fn test_drain_respects_sink_size() {
        let mut list = CommandList::new(IntPacking::BitCast);
        for slot in 0..4 {
            list.append(remove(slot));
        }

        // Room for one and a half slots: only one whole slot is written.
        let mut sink = vec![0u8; COMMAND_STRIDE_BYTES + COMMAND_STRIDE_BYTES / 2];
        assert_eq!(list.drain_up_to(4, &mut sink), 1);
        assert_eq!(list.depth(), 3);
    }

    #[test]
    fn test_encode_front_is_non_destructive() {
        let mut list = CommandList::new(IntPacking::Convert);
        list.append(remove(7));
        let mut sink = vec![0u8; COMMAND_STRIDE_BYTES];

        assert_eq!(list.encode_front(1, &mut sink), 1);
        assert_eq!(list.depth(), 1);

        let decoded = Command::decode(&sink, IntPacking::Convert).unwrap();
        assert_eq!(decoded, remove(7));

        list.discard_front(10);
        assert!(list.is_empty());
    }

    #[test]
    fn test_extend_appends_in_order() {
        let mut list = CommandList::new(IntPacking::BitCast);
        list.append(remove(0));
        list.extend([remove(1), remove(2)]);
        let order: Vec<_> = list.iter().copied().collect();
        assert_eq!(order, vec![remove(0), remove(1), remove(2)]);
    }
}

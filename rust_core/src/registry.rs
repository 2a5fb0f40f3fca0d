//! In-memory log of lobby announcements

use crate::models::Room;
use crate::protocol::{parse_room, ParseError};
use std::collections::VecDeque;

/// Ordered log of every Room accepted by the Room listener.
///
/// Codes are not unique; duplicates coexist. With a non-zero capacity the
/// oldest announcement is evicted once the log is full.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: VecDeque<Room>,
    capacity: Option<usize>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded registry. A capacity of 0 means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: VecDeque::new(),
            capacity: (capacity > 0).then_some(capacity),
        }
    }

    /// Parse a raw Room message and append it. Rejected input leaves the
    /// registry untouched.
    pub fn submit(&mut self, raw: &str) -> Result<Room, ParseError> {
        let room = parse_room(raw)?;

        if let Some(cap) = self.capacity {
            while self.rooms.len() >= cap {
                self.rooms.pop_front();
            }
        }
        self.rooms.push_back(room.clone());
        Ok(room)
    }

    pub fn format(&self, room: &Room) -> String {
        room.summary()
    }

    /// Every stored room with exactly this code, oldest first.
    pub fn find_by_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Room> + 'a {
        self.rooms.iter().filter(move |r| r.code == code)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

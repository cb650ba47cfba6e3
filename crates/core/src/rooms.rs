//! Room and stage traversal model.
//!
//! A room is an ordered sequence of stage waypoints the agent walks through
//! before reaching the player. The table is immutable after load; every
//! lookup failure afterwards is a caller bug or missing content, never a
//! mutation race.

use std::fmt;

use arrayvec::ArrayVec;

use crate::config::EncounterConfig;

/// Identifier for a room in the encounter layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomId(pub u16);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// World-space waypoint position.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

type StageList = ArrayVec<Position, { EncounterConfig::MAX_STAGES_PER_ROOM }>;

/// One room with its ordered stage waypoints.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    stages: StageList,
}

impl Room {
    /// Creates a room; the stage list may not be empty and may not exceed
    /// the stage capacity.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        stages: impl IntoIterator<Item = Position>,
    ) -> Result<Self, RoomError> {
        let mut list = StageList::new();
        for stage in stages {
            if list.try_push(stage).is_err() {
                return Err(RoomError::TooManyStages {
                    room: id,
                    max: EncounterConfig::MAX_STAGES_PER_ROOM,
                });
            }
        }
        if list.is_empty() {
            return Err(RoomError::NoStages { room: id });
        }
        Ok(Self {
            id,
            name: name.into(),
            stages: list,
        })
    }

    pub fn stages(&self) -> &[Position] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<Position> {
        self.stages.get(index).copied()
    }

    /// Index of the last stage in the traversal sequence.
    pub fn final_stage_index(&self) -> usize {
        self.stages.len() - 1
    }

    pub fn final_stage(&self) -> Position {
        self.stages[self.final_stage_index()]
    }
}

/// Errors raised while building or querying the room table.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room table is empty")]
    EmptyTable,

    #[error("{room} has no stage positions")]
    NoStages { room: RoomId },

    #[error("{room} exceeds the stage capacity of {max}")]
    TooManyStages { room: RoomId, max: usize },

    #[error("duplicate room id {room}")]
    DuplicateRoom { room: RoomId },

    #[error("unknown room id {room}")]
    UnknownRoom { room: RoomId },
}

/// Immutable lookup table of all rooms in the encounter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomTable {
    rooms: Vec<Room>,
}

impl RoomTable {
    /// Builds the table, validating uniqueness up front so the tick loop
    /// never has to handle duplicates.
    pub fn new(rooms: Vec<Room>) -> Result<Self, RoomError> {
        if rooms.is_empty() {
            return Err(RoomError::EmptyTable);
        }
        for (i, room) in rooms.iter().enumerate() {
            if rooms[..i].iter().any(|other| other.id == room.id) {
                return Err(RoomError::DuplicateRoom { room: room.id });
            }
        }
        Ok(Self { rooms })
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn require(&self, id: RoomId) -> Result<&Room, RoomError> {
        self.get(id).ok_or(RoomError::UnknownRoom { room: id })
    }

    /// Room at a positional index, for uniform random picks.
    pub fn by_index(&self, index: usize) -> Option<&Room> {
        self.rooms.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(x: f32) -> Position {
        Position::new(x, 0.0, 0.0)
    }

    #[test]
    fn rejects_empty_stage_list() {
        let err = Room::new(RoomId(0), "deck", []).unwrap_err();
        assert_eq!(err, RoomError::NoStages { room: RoomId(0) });
    }

    #[test]
    fn rejects_stage_overflow() {
        let too_many = (0..EncounterConfig::MAX_STAGES_PER_ROOM + 1).map(|i| stage(i as f32));
        let err = Room::new(RoomId(3), "hold", too_many).unwrap_err();
        assert_eq!(
            err,
            RoomError::TooManyStages {
                room: RoomId(3),
                max: EncounterConfig::MAX_STAGES_PER_ROOM,
            }
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let a = Room::new(RoomId(1), "helm", [stage(0.0)]).unwrap();
        let b = Room::new(RoomId(1), "hold", [stage(1.0)]).unwrap();
        let err = RoomTable::new(vec![a, b]).unwrap_err();
        assert_eq!(err, RoomError::DuplicateRoom { room: RoomId(1) });
    }

    #[test]
    fn final_stage_is_last_waypoint() {
        let room = Room::new(RoomId(2), "deck", [stage(0.0), stage(1.0), stage(2.0)]).unwrap();
        assert_eq!(room.final_stage_index(), 2);
        assert_eq!(room.final_stage(), stage(2.0));
    }

    #[test]
    fn require_reports_unknown_room() {
        let table =
            RoomTable::new(vec![Room::new(RoomId(0), "deck", [stage(0.0)]).unwrap()]).unwrap();
        assert!(matches!(
            table.require(RoomId(9)),
            Err(RoomError::UnknownRoom { room: RoomId(9) })
        ));
    }
}

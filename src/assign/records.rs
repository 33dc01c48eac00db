use super::join::{JoinOutcome, UploadRow};
use crate::core::{DeskError, EntityId, Result};
use crate::patch::PatchOperation;
use serde::{Deserialize, Serialize};

/// Seat of one intro-course participant, body item of the bulk
/// seat-assignment endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub intro_course_participation_id: EntityId,
    pub seat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<EntityId>,
}

impl SeatAssignment {
    pub fn to_patch(&self) -> Vec<PatchOperation> {
        let mut ops = vec![PatchOperation::replace("seat", self.seat.as_str())];
        if let Some(tutor) = &self.tutor_id {
            ops.push(PatchOperation::replace("tutor_id", tutor.as_str()));
        }
        ops
    }
}

/// Device placed on a seat, body item of the seat-plan endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairDeviceAssignment {
    pub seat: String,
    pub chair_device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<EntityId>,
}

impl ChairDeviceAssignment {
    pub fn to_patch(&self) -> Vec<PatchOperation> {
        let mut ops = vec![PatchOperation::replace("chair_device", self.chair_device.as_str())];
        if let Some(tutor) = &self.tutor_id {
            ops.push(PatchOperation::replace("tutor_id", tutor.as_str()));
        }
        ops
    }
}

/// Upload columns carrying the assigned values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentColumns {
    pub seat: String,
    #[serde(default)]
    pub chair_device: Option<String>,
    #[serde(default)]
    pub tutor: Option<String>,
}

impl AssignmentColumns {
    pub fn new(seat: impl Into<String>) -> Self {
        Self {
            seat: seat.into(),
            chair_device: None,
            tutor: None,
        }
    }

    pub fn chair_device(mut self, column: impl Into<String>) -> Self {
        self.chair_device = Some(column.into());
        self
    }

    pub fn tutor(mut self, column: impl Into<String>) -> Self {
        self.tutor = Some(column.into());
        self
    }
}

/// One seat assignment per matched participant.
///
/// Matched rows without a seat value are skipped.
pub fn seat_assignments(outcome: &JoinOutcome<'_>, columns: &AssignmentColumns) -> Vec<SeatAssignment> {
    outcome
        .matches()
        .filter_map(|matched| {
            let seat = cell(matched.row, &columns.seat)?;
            Some(SeatAssignment {
                intro_course_participation_id: matched.entity.id.clone(),
                seat,
                tutor_id: tutor_cell(matched.row, columns),
            })
        })
        .collect()
}

/// Chair devices for a seat plan, keyed by seat.
///
/// Rows are taken as uploaded; a later row for the same seat replaces an
/// earlier one. Rows missing the seat or device value are skipped.
pub fn chair_device_assignments(rows: &[UploadRow], columns: &AssignmentColumns) -> Result<Vec<ChairDeviceAssignment>> {
    let device_column = columns
        .chair_device
        .as_deref()
        .ok_or_else(|| DeskError::validation("A chair device column must be selected"))?;

    let mut by_seat: indexmap::IndexMap<String, ChairDeviceAssignment> = indexmap::IndexMap::new();
    for row in rows {
        let (Some(seat), Some(chair_device)) = (cell(row, &columns.seat), cell(row, device_column)) else {
            continue;
        };
        by_seat.insert(
            seat.clone(),
            ChairDeviceAssignment {
                seat,
                chair_device,
                tutor_id: tutor_cell(row, columns),
            },
        );
    }
    Ok(by_seat.into_values().collect())
}

fn cell(row: &UploadRow, column: &str) -> Option<String> {
    row.get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn tutor_cell(row: &UploadRow, columns: &AssignmentColumns) -> Option<EntityId> {
    columns
        .tutor
        .as_deref()
        .and_then(|column| cell(row, column))
        .map(EntityId::from)
}

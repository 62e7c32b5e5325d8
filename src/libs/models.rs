// models.rs
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use uuid::Uuid;

/// The four record kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    Patient,
    Medicine,
    Appointment,
    Prescription,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Patient => "Patient",
            EntityKind::Medicine => "Medicine",
            EntityKind::Appointment => "Appointment",
            EntityKind::Prescription => "Prescription",
        }
    }

    /// Path segment used for the collection's routes.
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patients",
            EntityKind::Medicine => "medicines",
            EntityKind::Appointment => "appointments",
            EntityKind::Prescription => "prescriptions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A foreign-key value carried by a draft or a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: Uuid,
}

impl Reference {
    fn new(field: &'static str, kind: EntityKind, id: Uuid) -> Self {
        Self { field, kind, id }
    }
}

/// A record type the store can hold.
///
/// `Draft` is the payload of a create call (every field but the id), `Patch`
/// is a partial update where each field is an explicit optional override.
pub trait Entity: Clone + Serialize + Send + Sync + 'static {
    const KIND: EntityKind;

    type Draft: DeserializeOwned + Send + 'static;
    type Patch: DeserializeOwned + Default + Send + 'static;

    fn from_draft(id: Uuid, draft: Self::Draft) -> Self;

    fn id(&self) -> Uuid;

    /// References that must resolve before the draft is stored.
    fn draft_references(_draft: &Self::Draft) -> Vec<Reference> {
        Vec::new()
    }

    /// References supplied by the patch; absent or null ones are skipped.
    fn patch_references(_patch: &Self::Patch) -> Vec<Reference> {
        Vec::new()
    }

    fn apply(&mut self, patch: Self::Patch);
}

/// Keeps an explicit `null` apart from a missing field: missing stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// ISO-8601 timestamp, with or without a zone. Zoned values are stored as UTC.
fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    match DateTime::<FixedOffset>::parse_from_rfc3339(value) {
        Ok(zoned) => Ok(zoned.naive_utc()),
        Err(_) => value.parse::<NaiveDateTime>(),
    }
}

fn timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_timestamp(&value).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_timestamp(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

// -------- Patient --------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub approx_age: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub approx_age: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(deserialize_with = "nullable")]
    pub approx_age: Option<Option<i32>>,
}

impl Entity for Patient {
    const KIND: EntityKind = EntityKind::Patient;
    type Draft = NewPatient;
    type Patch = PatientPatch;

    fn from_draft(id: Uuid, draft: NewPatient) -> Self {
        Self {
            id,
            name: draft.name,
            date_of_birth: draft.date_of_birth,
            approx_age: draft.approx_age,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: PatientPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            self.date_of_birth = date_of_birth;
        }
        if let Some(approx_age) = patch.approx_age {
            self.approx_age = approx_age;
        }
    }
}

// -------- Medicine --------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub quantity: Option<u32>,
}

impl Entity for Medicine {
    const KIND: EntityKind = EntityKind::Medicine;
    type Draft = NewMedicine;
    type Patch = MedicinePatch;

    fn from_draft(id: Uuid, draft: NewMedicine) -> Self {
        Self {
            id,
            name: draft.name,
            quantity: draft.quantity,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: MedicinePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
    }
}

// -------- Appointment --------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_time: NaiveDateTime,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    #[serde(deserialize_with = "timestamp")]
    pub appointment_time: NaiveDateTime,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentPatch {
    pub patient_id: Option<Uuid>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub appointment_time: Option<NaiveDateTime>,
    #[serde(deserialize_with = "nullable")]
    pub diagnosis: Option<Option<String>>,
}

impl Entity for Appointment {
    const KIND: EntityKind = EntityKind::Appointment;
    type Draft = NewAppointment;
    type Patch = AppointmentPatch;

    fn from_draft(id: Uuid, draft: NewAppointment) -> Self {
        Self {
            id,
            patient_id: draft.patient_id,
            appointment_time: draft.appointment_time,
            diagnosis: draft.diagnosis,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn draft_references(draft: &NewAppointment) -> Vec<Reference> {
        vec![Reference::new("patient_id", EntityKind::Patient, draft.patient_id)]
    }

    fn patch_references(patch: &AppointmentPatch) -> Vec<Reference> {
        patch
            .patient_id
            .map(|id| Reference::new("patient_id", EntityKind::Patient, id))
            .into_iter()
            .collect()
    }

    fn apply(&mut self, patch: AppointmentPatch) {
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = patient_id;
        }
        if let Some(appointment_time) = patch.appointment_time {
            self.appointment_time = appointment_time;
        }
        if let Some(diagnosis) = patch.diagnosis {
            self.diagnosis = diagnosis;
        }
    }
}

// -------- Prescription --------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub medicine_id: Uuid,
    pub quantity: NonZeroU32,
    pub prescribed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub medicine_id: Uuid,
    pub quantity: NonZeroU32,
    #[serde(deserialize_with = "timestamp")]
    pub prescribed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrescriptionPatch {
    pub appointment_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub medicine_id: Option<Uuid>,
    pub quantity: Option<NonZeroU32>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub prescribed_at: Option<NaiveDateTime>,
}

impl Entity for Prescription {
    const KIND: EntityKind = EntityKind::Prescription;
    type Draft = NewPrescription;
    type Patch = PrescriptionPatch;

    fn from_draft(id: Uuid, draft: NewPrescription) -> Self {
        Self {
            id,
            appointment_id: draft.appointment_id,
            patient_id: draft.patient_id,
            medicine_id: draft.medicine_id,
            quantity: draft.quantity,
            prescribed_at: draft.prescribed_at,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    // Checked in this order; the first miss is the one reported.
    fn draft_references(draft: &NewPrescription) -> Vec<Reference> {
        vec![
            Reference::new("patient_id", EntityKind::Patient, draft.patient_id),
            Reference::new("appointment_id", EntityKind::Appointment, draft.appointment_id),
            Reference::new("medicine_id", EntityKind::Medicine, draft.medicine_id),
        ]
    }

    fn patch_references(patch: &PrescriptionPatch) -> Vec<Reference> {
        [
            ("patient_id", EntityKind::Patient, patch.patient_id),
            ("appointment_id", EntityKind::Appointment, patch.appointment_id),
            ("medicine_id", EntityKind::Medicine, patch.medicine_id),
        ]
        .into_iter()
        .filter_map(|(field, kind, id)| id.map(|id| Reference::new(field, kind, id)))
        .collect()
    }

    fn apply(&mut self, patch: PrescriptionPatch) {
        if let Some(appointment_id) = patch.appointment_id {
            self.appointment_id = appointment_id;
        }
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = patient_id;
        }
        if let Some(medicine_id) = patch.medicine_id {
            self.medicine_id = medicine_id;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(prescribed_at) = patch.prescribed_at {
            self.prescribed_at = prescribed_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_tells_null_from_missing() {
        let missing: PatientPatch = serde_json::from_value(json!({ "name": "Ada" })).unwrap();
        assert_eq!(missing.approx_age, None);

        let cleared: PatientPatch = serde_json::from_value(json!({ "approx_age": null })).unwrap();
        assert_eq!(cleared.approx_age, Some(None));
        assert_eq!(cleared.name, None);

        let set: AppointmentPatch =
            serde_json::from_value(json!({ "diagnosis": "Migraine" })).unwrap();
        assert_eq!(set.diagnosis, Some(Some("Migraine".to_string())));
    }

    #[test]
    fn quantities_are_range_checked_on_decode() {
        let negative = serde_json::from_value::<NewMedicine>(json!({ "name": "x", "quantity": -1 }));
        assert!(negative.is_err());

        let zero = serde_json::from_value::<NewPrescription>(json!({
            "appointment_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "medicine_id": Uuid::new_v4(),
            "quantity": 0,
            "prescribed_at": "2025-08-20T10:00:00",
        }));
        assert!(zero.is_err());

        let zero_patch = serde_json::from_value::<PrescriptionPatch>(json!({ "quantity": 0 }));
        assert!(zero_patch.is_err());
    }

    #[test]
    fn timestamps_accept_zones_and_store_utc() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 20)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        for value in ["2025-08-20T10:00:00", "2025-08-20T10:00:00Z", "2025-08-20T12:00:00+02:00"] {
            let draft: NewAppointment = serde_json::from_value(json!({
                "patient_id": Uuid::new_v4(),
                "appointment_time": value,
            }))
            .unwrap();
            assert_eq!(draft.appointment_time, expected, "{value}");
        }

        let patch: PrescriptionPatch =
            serde_json::from_value(json!({ "prescribed_at": "2025-08-20T05:00:00-05:00" })).unwrap();
        assert_eq!(patch.prescribed_at, Some(expected));

        let untouched: PrescriptionPatch = serde_json::from_value(json!({ "quantity": 3 })).unwrap();
        assert_eq!(untouched.prescribed_at, None);

        let garbage = serde_json::from_value::<AppointmentPatch>(json!({ "appointment_time": "soon" }));
        assert!(garbage.is_err());
    }

    #[test]
    fn apply_touches_only_supplied_fields() {
        let patient_id = Uuid::new_v4();
        let mut appointment = Appointment::from_draft(
            Uuid::new_v4(),
            NewAppointment {
                patient_id,
                appointment_time: NaiveDate::from_ymd_opt(2025, 8, 20)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                diagnosis: Some("Flu symptoms".into()),
            },
        );
        let before = appointment.clone();

        appointment.apply(AppointmentPatch::default());
        assert_eq!(appointment, before);

        appointment.apply(AppointmentPatch {
            diagnosis: Some(None),
            ..Default::default()
        });
        assert_eq!(appointment.diagnosis, None);
        assert_eq!(appointment.patient_id, patient_id);
        assert_eq!(appointment.appointment_time, before.appointment_time);
    }

    #[test]
    fn prescription_patch_lists_only_supplied_references() {
        let medicine_id = Uuid::new_v4();
        let refs = Prescription::patch_references(&PrescriptionPatch {
            medicine_id: Some(medicine_id),
            ..Default::default()
        });
        assert_eq!(
            refs,
            vec![Reference::new("medicine_id", EntityKind::Medicine, medicine_id)]
        );
    }
}

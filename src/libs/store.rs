use crate::libs::error::{EmrError, Result};
use crate::libs::models::{
    Appointment, Entity, EntityKind, Medicine, NewAppointment, NewMedicine, NewPatient,
    NewPrescription, Patient, Prescription, Reference,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::num::NonZeroU32;
use uuid::Uuid;

struct Rows<T> {
    order: Vec<Uuid>,
    by_id: HashMap<Uuid, T>,
}

/// A keyed collection of one entity kind, in insertion order.
pub struct Collection<T> {
    rows: RwLock<Rows<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Rows {
                order: Vec::new(),
                by_id: HashMap::new(),
            }),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn len(&self) -> usize {
        self.rows.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.rows.read().by_id.contains_key(id)
    }

    // -------- Insert a record --------
    fn insert(&self, draft: T::Draft) -> T {
        let mut rows = self.rows.write();
        let mut id = Uuid::new_v4();
        while rows.by_id.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let entity = T::from_draft(id, draft);
        rows.order.push(id);
        rows.by_id.insert(id, entity.clone());
        entity
    }

    // -------- Get all records --------
    fn all(&self) -> Vec<T> {
        let rows = self.rows.read();
        rows.order
            .iter()
            .filter_map(|id| rows.by_id.get(id).cloned())
            .collect()
    }

    fn get(&self, id: &Uuid) -> Option<T> {
        self.rows.read().by_id.get(id).cloned()
    }

    // -------- Update record --------
    fn update(&self, id: &Uuid, patch: T::Patch) -> Option<T> {
        let mut rows = self.rows.write();
        let entity = rows.by_id.get_mut(id)?;
        entity.apply(patch);
        Some(entity.clone())
    }
}

/// Entities that have a collection in [`MemoryStore`].
pub trait Stored: Entity {
    fn collection(store: &MemoryStore) -> &Collection<Self>;
}

impl Stored for Patient {
    fn collection(store: &MemoryStore) -> &Collection<Self> {
        &store.patients
    }
}

impl Stored for Medicine {
    fn collection(store: &MemoryStore) -> &Collection<Self> {
        &store.medicines
    }
}

impl Stored for Appointment {
    fn collection(store: &MemoryStore) -> &Collection<Self> {
        &store.appointments
    }
}

impl Stored for Prescription {
    fn collection(store: &MemoryStore) -> &Collection<Self> {
        &store.prescriptions
    }
}

/// In-memory EMR data: one collection per entity kind, with foreign keys
/// checked against the other collections on every write.
///
/// References are validated before the target collection is locked for
/// writing. Nothing can be deleted, so a reference that passed the check
/// still resolves when the write lands.
#[derive(Default)]
pub struct MemoryStore {
    patients: Collection<Patient>,
    medicines: Collection<Medicine>,
    appointments: Collection<Appointment>,
    prescriptions: Collection<Prescription>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the sample patients, medicines, appointments and
    /// prescription used by the demo.
    pub fn with_demo_data() -> Result<Self> {
        let store = Self::new();

        let alice = store.create::<Patient>(NewPatient {
            name: "Alice Smith".into(),
            date_of_birth: ALICE_BIRTH,
            approx_age: Some(39),
        })?;
        let bob = store.create::<Patient>(NewPatient {
            name: "Bob Johnson".into(),
            date_of_birth: BOB_BIRTH,
            approx_age: Some(32),
        })?;

        store.create::<Medicine>(NewMedicine {
            name: "Aspirin 81mg".into(),
            quantity: 100,
        })?;
        let amoxicillin = store.create::<Medicine>(NewMedicine {
            name: "Amoxicillin 500mg".into(),
            quantity: 50,
        })?;

        let flu = store.create::<Appointment>(NewAppointment {
            patient_id: alice.id,
            appointment_time: FLU_VISIT,
            diagnosis: Some("Flu symptoms".into()),
        })?;
        store.create::<Appointment>(NewAppointment {
            patient_id: bob.id,
            appointment_time: CHECK_UP_VISIT,
            diagnosis: Some("Routine check-up".into()),
        })?;

        store.create::<Prescription>(NewPrescription {
            appointment_id: flu.id,
            patient_id: alice.id,
            medicine_id: amoxicillin.id,
            quantity: AMOXICILLIN_COURSE,
            prescribed_at: Utc::now().naive_utc(),
        })?;

        Ok(store)
    }

    pub fn exists(&self, kind: EntityKind, id: &Uuid) -> bool {
        match kind {
            EntityKind::Patient => self.patients.contains(id),
            EntityKind::Medicine => self.medicines.contains(id),
            EntityKind::Appointment => self.appointments.contains(id),
            EntityKind::Prescription => self.prescriptions.contains(id),
        }
    }

    fn check_references(&self, owner: EntityKind, references: &[Reference]) -> Result<()> {
        match references.iter().find(|r| !self.exists(r.kind, &r.id)) {
            Some(missing) => {
                warn!(
                    "Rejected {} write: {} {} does not exist",
                    owner, missing.field, missing.id
                );
                Err(EmrError::ReferenceNotFound {
                    field: missing.field,
                    kind: missing.kind,
                    id: missing.id,
                })
            }
            None => Ok(()),
        }
    }

    /// Validate the draft's references, assign a fresh id and store it.
    pub fn create<T: Stored>(&self, draft: T::Draft) -> Result<T> {
        self.check_references(T::KIND, &T::draft_references(&draft))?;
        let entity = T::collection(self).insert(draft);
        debug!("Created {} {}", T::KIND, entity.id());
        Ok(entity)
    }

    pub fn list<T: Stored>(&self) -> Vec<T> {
        T::collection(self).all()
    }

    pub fn get<T: Stored>(&self, id: Uuid) -> Result<T> {
        T::collection(self)
            .get(&id)
            .ok_or(EmrError::NotFound(T::KIND))
    }

    /// Apply the supplied fields of `patch` to the entity with this id.
    pub fn update<T: Stored>(&self, id: Uuid, patch: T::Patch) -> Result<T> {
        let collection = T::collection(self);
        if !collection.contains(&id) {
            return Err(EmrError::NotFound(T::KIND));
        }
        self.check_references(T::KIND, &T::patch_references(&patch))?;
        let entity = collection
            .update(&id, patch)
            .ok_or(EmrError::NotFound(T::KIND))?;
        debug!("Updated {} {}", T::KIND, id);
        Ok(entity)
    }

    pub fn len<T: Stored>(&self) -> usize {
        T::collection(self).len()
    }
}

// Demo seed values; an invalid literal fails const evaluation.
const ALICE_BIRTH: NaiveDate = demo_date(1985, 1, 15);
const BOB_BIRTH: NaiveDate = demo_date(1992, 7, 22);
const FLU_VISIT: NaiveDateTime = demo_time(demo_date(2025, 8, 20), 10, 0);
const CHECK_UP_VISIT: NaiveDateTime = demo_time(demo_date(2025, 8, 20), 14, 30);
const AMOXICILLIN_COURSE: NonZeroU32 = match NonZeroU32::new(20) {
    Some(quantity) => quantity,
    None => panic!("demo quantity must be positive"),
};

const fn demo_date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid demo date"),
    }
}

const fn demo_time(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    match date.and_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => panic!("invalid demo time"),
    }
}

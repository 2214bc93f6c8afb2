use std::collections::HashSet;

use herdlog_core::AnimalRecord;
use herdlog_engine::{UploadError, Uploader};

/// In-process stand-in for the remote backend. Accepts everything except
/// records for animals it has been told to reject.
#[derive(Debug, Default)]
pub struct FakeBackend {
    received: Vec<AnimalRecord>,
    rejected_animals: HashSet<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_animal(&mut self, animal_id: &str) {
        self.rejected_animals.insert(animal_id.to_string());
    }

    pub fn accept_animal(&mut self, animal_id: &str) {
        self.rejected_animals.remove(animal_id);
    }

    pub fn received(&self) -> &[AnimalRecord] {
        &self.received
    }

    pub fn received_animals(&self) -> Vec<&str> {
        self.received.iter().map(|r| r.animal_id.as_str()).collect()
    }
}

impl Uploader for FakeBackend {
    fn upload(&mut self, record: &AnimalRecord) -> Result<(), UploadError> {
        if self.rejected_animals.contains(&record.animal_id) {
            return Err(UploadError::new(format!("backend rejected {}", record.animal_id)));
        }
        self.received.push(record.clone());
        Ok(())
    }
}

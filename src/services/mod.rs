//! External lookups and domain calculations used by the dashboard and tracker.

pub mod assessment;
pub mod medicine;
pub mod places;

pub use assessment::{AssessmentAnswers, AssessmentResult};
pub use medicine::{MedicineClient, MedicineError, MedicineInfo};
pub use places::{NearbyHospitals, NearbyRequest, PlacesClient, PlacesError};

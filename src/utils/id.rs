use uuid::Uuid;

/// Fresh identifier for an uploaded file. Random v4, no store coordination.
pub fn new_file_id() -> Uuid {
    Uuid::new_v4()
}

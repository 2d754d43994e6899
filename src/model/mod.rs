pub mod attendance;
pub mod camper;
pub mod checkpoint;
pub mod status;

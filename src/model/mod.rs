pub mod chc;
pub mod facility;
pub mod medicine;
pub mod queues;
pub mod topology;

pub mod processed_ids;

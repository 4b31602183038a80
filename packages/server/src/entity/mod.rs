pub mod submission_result;

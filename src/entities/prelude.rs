pub use super::work_files::Entity as WorkFiles;
pub use super::works::Entity as Works;

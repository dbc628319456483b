pub mod prelude;

pub mod work_files;
pub mod works;

pub mod repo;
pub mod repo_types;

#[cfg(test)]
pub mod memory;

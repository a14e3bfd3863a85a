mod test_commands;
mod test_tree;

pub use fixture::Fixture;

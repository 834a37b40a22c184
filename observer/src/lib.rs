pub mod client;
pub mod observer;
pub mod prelude;
pub mod problems;
pub mod render;
pub mod session;
pub mod view;

#[cfg(test)]
mod test;

pub mod packet;
pub mod capture;

#[cfg(test)]
pub mod mock;

mod client;

pub use client::WeaviateStore;

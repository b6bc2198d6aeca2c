mod client;

pub use client::QuickChartClient;

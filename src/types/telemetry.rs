//! Host resource telemetry record

use crate::feature_contract::FeatureVector;
use serde::{Deserialize, Serialize};

/// One host telemetry sample with the 14 contract columns.
///
/// Field order matches the feature contract; serde names match the
/// training table headers so samples can be written to and read from CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// I/O operations issued by the process
    #[serde(rename = "I/O Data Operations")]
    pub io_data_operations: f64,

    /// Bytes moved by I/O operations
    #[serde(rename = "I/O Data Bytes")]
    pub io_data_bytes: f64,

    #[serde(rename = "Number of subprocesses")]
    pub number_of_subprocesses: f64,

    /// Fraction of time spent on the CPU
    #[serde(rename = "Time on processor")]
    pub time_on_processor: f64,

    #[serde(rename = "Disk Reading/sec")]
    pub disk_reading_sec: f64,

    #[serde(rename = "Disc Writing/sec")]
    pub disc_writing_sec: f64,

    #[serde(rename = "Bytes Sent")]
    pub bytes_sent: f64,

    #[serde(rename = "Received Bytes (HTTP)")]
    pub received_bytes_http: f64,

    #[serde(rename = "Network packets sent")]
    pub network_packets_sent: f64,

    #[serde(rename = "Network packets received")]
    pub network_packets_received: f64,

    #[serde(rename = "Pages Read/sec")]
    pub pages_read_sec: f64,

    #[serde(rename = "Pages Input/sec")]
    pub pages_input_sec: f64,

    #[serde(rename = "Page Errors/sec")]
    pub page_errors_sec: f64,

    /// Derived spread metric over transferred bytes
    #[serde(rename = "Confirmed byte radius")]
    pub confirmed_byte_radius: f64,
}

impl TelemetrySample {
    /// Feature vector in contract order.
    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector::new([
            self.io_data_operations,
            self.io_data_bytes,
            self.number_of_subprocesses,
            self.time_on_processor,
            self.disk_reading_sec,
            self.disc_writing_sec,
            self.bytes_sent,
            self.received_bytes_http,
            self.network_packets_sent,
            self.network_packets_received,
            self.pages_read_sec,
            self.pages_input_sec,
            self.page_errors_sec,
            self.confirmed_byte_radius,
        ])
    }

    /// Heavy paging with a busy processor and little network traffic.
    pub fn suspicious_example() -> Self {
        Self {
            io_data_operations: 114.7988996,
            io_data_bytes: 3790.450939,
            number_of_subprocesses: 28.0,
            time_on_processor: 0.427077829,
            disk_reading_sec: 6.162365173,
            disc_writing_sec: 21.22040265,
            bytes_sent: 58.49277265,
            received_bytes_http: 63.95938691,
            network_packets_sent: 0.621206167,
            network_packets_received: 0.52181318,
            pages_read_sec: 24.62461244,
            pages_input_sec: 0.0,
            page_errors_sec: 1001.53343,
            confirmed_byte_radius: 27.1908433,
        }
    }

    pub fn normal_example() -> Self {
        Self {
            io_data_operations: 32.7094298,
            io_data_bytes: 121124.1414,
            number_of_subprocesses: 30.40735917,
            time_on_processor: 0.496718733,
            disk_reading_sec: 3.999063766,
            disc_writing_sec: 0.0,
            bytes_sent: 335.565884,
            received_bytes_http: 737.3384903,
            network_packets_sent: 1.844012736,
            network_packets_received: 1.910663799,
            pages_read_sec: 0.311038293,
            pages_input_sec: 0.0,
            page_errors_sec: 726.318848,
            confirmed_byte_radius: 20.00868554,
        }
    }
}

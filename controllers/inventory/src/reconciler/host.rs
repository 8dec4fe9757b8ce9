//! HostInfo <- HostSystem

use super::extract::Fields;
use super::InventoryResource;
use crate::error::ControllerError;
use crate::status::StatusRecord;
use crds::HostInfo;
use vsphere_client::{InventoryKind, InventoryObject};

const BYTES_PER_MB: i64 = 1024 * 1024;

impl InventoryResource for HostInfo {
    const INVENTORY_KIND: InventoryKind = InventoryKind::HostSystem;

    const STATUS_FIELDS: &'static [&'static str] = &[
        "hostType",
        "hostConnectionState",
        "hostPowerState",
        "hostMaintenanceMode",
        "hostOverallStatus",
        "totalCPU",
        "freeCPU",
        "totalMemory",
        "freeMemory",
    ];

    fn target_name(&self) -> &str {
        &self.spec.hostname
    }

    /// Hardware and quick stats are absent for disconnected hosts, so the
    /// capacity fields are only set when their inputs are present.
    fn map_status(object: &InventoryObject, record: &mut StatusRecord) -> Result<(), ControllerError> {
        let f = Fields::of(object);

        record.set_opt("hostType", f.optional_str("summary.config.product.fullName")?);
        record.set("hostConnectionState", f.required_str("summary.runtime.connectionState")?);
        record.set_opt("hostPowerState", f.optional_str("summary.runtime.powerState")?);
        record.set_opt("hostMaintenanceMode", f.optional_bool("summary.runtime.inMaintenanceMode")?);
        record.set_opt("hostOverallStatus", f.optional_str("summary.overallStatus")?);

        let cores = f.optional_i64("summary.hardware.numCpuCores")?;
        let mhz = f.optional_i64("summary.hardware.cpuMhz")?;
        let total_cpu = cores.zip(mhz).map(|(cores, mhz)| cores * mhz);
        let cpu_usage = f.optional_i64("summary.quickStats.overallCpuUsage")?;
        record.set_opt("totalCPU", total_cpu);
        record.set_opt("freeCPU", total_cpu.zip(cpu_usage).map(|(total, used)| (total - used).max(0)));

        let total_memory = f.optional_i64("summary.hardware.memorySize")?.map(|bytes| bytes / BYTES_PER_MB);
        let memory_usage = f.optional_i64("summary.quickStats.overallMemoryUsage")?;
        record.set_opt("totalMemory", total_memory);
        record.set_opt(
            "freeMemory",
            total_memory.zip(memory_usage).map(|(total, used)| (total - used).max(0)),
        );
        Ok(())
    }
}

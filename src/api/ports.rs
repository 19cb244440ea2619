//! Printer (port/device) operations.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{FleetApi, Op};
use crate::communication::ApiRequest;
use crate::models::{Device, DeviceId, Envelope, PrinterRegistration, PrinterStatus, SerialPort};

const PORTS: Op = Op {
    fault: "An error occurred while retrieving the ports",
    unexpected: "Failed to retrieve ports. Unexpected response",
};
const REGISTER: Op = Op {
    fault: "An error occurred while registering the printer",
    unexpected: "Failed to register printer. Unexpected response",
};
const PRINTERS: Op = Op {
    fault: "An error occurred while retrieving the printers",
    unexpected: "Failed to retrieve printers. Unexpected response",
};
const PRINTER_INFO: Op = Op {
    fault: "An error occurred while retrieving printer information",
    unexpected: "Failed to retrieve printer information. Unexpected response",
};
const SET_STATUS: Op = Op {
    fault: "An error occurred while setting the printer status",
    unexpected: "Failed to set printer status. Unexpected response",
};
const HARD_RESET: Op = Op {
    fault: "An error occurred while resetting the printer",
    unexpected: "Failed to reset printer. Unexpected response",
};
const QUEUE_RESTORE: Op = Op {
    fault: "An error occurred while restoring the queue",
    unexpected: "Failed to restore queue. Unexpected response",
};

#[derive(Deserialize)]
struct PrintersReply {
    printers: Vec<Device>,
}

impl FleetApi {
    /// Serial ports the server can see, registered or not.
    pub async fn ports(&self) -> Option<Vec<SerialPort>> {
        self.fetch(ApiRequest::get("getports"), PORTS).await
    }

    pub async fn register_printer(&self, printer: &PrinterRegistration) -> Option<Envelope> {
        let body = json!({ "printer": printer });
        self.command(ApiRequest::post("register", body), REGISTER).await
    }

    /// Registered printers as stored by the server (no queues).
    pub async fn printers(&self) -> Option<Vec<Device>> {
        let reply: PrintersReply = self.fetch(ApiRequest::get("getprinters"), PRINTERS).await?;
        Some(reply.printers)
    }

    /// Printers with running service threads, including their queues.
    pub async fn printer_info(&self) -> Option<Vec<Device>> {
        self.fetch(ApiRequest::get("getprinterinfo"), PRINTER_INFO).await
    }

    pub async fn set_status(&self, printer_id: DeviceId, status: &PrinterStatus) -> Option<Value> {
        let body = json!({ "printerid": printer_id, "status": status.as_str() });
        self.fetch(ApiRequest::post("setstatus", body), SET_STATUS).await
    }

    pub async fn hard_reset(&self, printer_id: DeviceId) -> Option<Envelope> {
        let body = json!({ "printerid": printer_id });
        self.command(ApiRequest::post("hardreset", body), HARD_RESET).await
    }

    pub async fn queue_restore(&self, printer_id: DeviceId) -> Option<Envelope> {
        let body = json!({ "printerid": printer_id });
        self.command(ApiRequest::post("queuerestore", body), QUEUE_RESTORE).await
    }
}

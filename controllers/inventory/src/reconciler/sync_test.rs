//! Unit tests for status synchronization

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::sync::{sync, SyncOutcome};
    use crate::status::{StatusRecord, StatusValue};
    use crate::test_utils::*;
    use serde_json::json;
    use std::sync::Arc;
    use vsphere_client::{
        accessor, InventoryKind, InventoryObjectSet, ManagedObjectReference, MockVSphereClient, VSphereClientTrait,
    };

    async fn snapshot(mock: &Arc<MockVSphereClient>) -> InventoryObjectSet {
        let client: Arc<dyn VSphereClientTrait> = mock.clone();
        accessor::list_all(&client, InventoryKind::VirtualMachine).await.unwrap()
    }

    fn matched(outcome: SyncOutcome) -> StatusRecord {
        match outcome {
            SyncOutcome::Matched { record, .. } => record,
            SyncOutcome::NoMatch => panic!("expected a match"),
        }
    }

    fn scenario_inventory() -> Arc<MockVSphereClient> {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_standard_network(&mock, "network-7", "VM Network", "green");
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[net]);
        mock
    }

    #[tokio::test]
    async fn test_standard_binding_scenario() {
        let mock = scenario_inventory();
        let objects = snapshot(&mock).await;

        let record = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap());

        let mut expected = StatusRecord::new();
        expected.set("vmTotalCPU", 4i64);
        expected.set("vmTotalMem", 8192i64);
        expected.set("vmPowerState", "poweredOn");
        expected.set("switchType", "Standard");
        expected.set("netName", "VM Network");
        expected.set("netOverallStatus", "green");
        assert_eq!(record, expected);
    }

    #[tokio::test]
    async fn test_no_match_scenario() {
        let mock = scenario_inventory();
        let objects = snapshot(&mock).await;

        let outcome = sync(mock.as_ref(), &node_info("b", "node-b"), &objects).await.unwrap();

        assert_eq!(outcome, SyncOutcome::NoMatch);
        assert!(mock.property_requests().is_empty(), "no network is resolved without a match");
    }

    #[tokio::test]
    async fn test_match_is_exact_and_case_sensitive() {
        let mock = scenario_inventory();
        let objects = snapshot(&mock).await;

        for target in ["Node-A", "node-a ", "node"] {
            let outcome = sync(mock.as_ref(), &node_info("x", target), &objects).await.unwrap();
            assert_eq!(outcome, SyncOutcome::NoMatch, "{:?} must not match", target);
        }
    }

    #[tokio::test]
    async fn test_distributed_single_vlan_scenario() {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_distributed_network(&mock, "dvportgroup-21", "dvpg-prod", "green", single_vlan(1025));
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[net]);
        let objects = snapshot(&mock).await;

        let record = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap());

        assert_eq!(record.get("switchType"), Some(&StatusValue::from("Distributed")));
        assert_eq!(record.get("netName"), Some(&StatusValue::from("dvpg-prod")));
        assert_eq!(record.get("vlanId"), Some(&StatusValue::Int(1025)));
    }

    #[tokio::test]
    async fn test_trunk_vlan_scenario_fails_closed() {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_distributed_network(&mock, "dvportgroup-22", "dvpg-trunk", "green", trunk_vlan(100, 200));
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[net]);
        let objects = snapshot(&mock).await;

        let err = sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap_err();

        assert!(matches!(err, ControllerError::VSphere(ref e) if e.is_unknown_variant()), "got {}", err);
    }

    #[tokio::test]
    async fn test_standard_binding_never_reads_vlan() {
        let mock = scenario_inventory();
        let objects = snapshot(&mock).await;

        let record = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap());

        assert!(record.get("vlanId").is_none());
        let requests = mock.property_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].1.iter().all(|path| !path.contains("PortConfig") && !path.starts_with("config")));
    }

    #[tokio::test]
    async fn test_first_match_wins_in_retrieval_order() {
        let mock = Arc::new(MockVSphereClient::new());
        add_vm(&mock, "vm-20", "node-a", vm_summary(2, 2048, "poweredOff"), &[]);
        add_vm(&mock, "vm-10", "node-a", vm_summary(16, 65536, "poweredOn"), &[]);
        let objects = snapshot(&mock).await;

        let outcome = sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap();

        match outcome {
            SyncOutcome::Matched { object, record } => {
                assert_eq!(object, ManagedObjectReference::new("VirtualMachine", "vm-20"));
                assert_eq!(record.get("vmTotalCPU"), Some(&StatusValue::Int(2)));
            }
            SyncOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn test_repeated_sync_is_identical() {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_distributed_network(&mock, "dvportgroup-21", "dvpg-prod", "green", single_vlan(30));
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[net]);
        let objects = snapshot(&mock).await;
        let node = node_info("a", "node-a");

        let first = sync(mock.as_ref(), &node, &objects).await.unwrap();
        let second = sync(mock.as_ref(), &node, &objects).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_last_network_wins() {
        let mock = Arc::new(MockVSphereClient::new());
        let dvpg = add_distributed_network(&mock, "dvportgroup-21", "dvpg-prod", "green", single_vlan(1025));
        let std_net = add_standard_network(&mock, "network-7", "VM Network", "yellow");
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[dvpg.clone(), std_net.clone()]);
        add_vm(&mock, "vm-2", "node-b", vm_summary(4, 8192, "poweredOn"), &[std_net, dvpg]);
        let objects = snapshot(&mock).await;

        let a = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap());
        assert_eq!(a.get("switchType"), Some(&StatusValue::from("Standard")));
        assert_eq!(a.get("netName"), Some(&StatusValue::from("VM Network")));
        assert!(a.get("vlanId").is_none());

        let b = matched(sync(mock.as_ref(), &node_info("b", "node-b"), &objects).await.unwrap());
        assert_eq!(b.get("switchType"), Some(&StatusValue::from("Distributed")));
        assert_eq!(b.get("vlanId"), Some(&StatusValue::Int(1025)));
    }

    #[tokio::test]
    async fn test_missing_required_property_aborts() {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_standard_network(&mock, "network-7", "VM Network", "green");
        add_vm(
            &mock,
            "vm-1",
            "node-a",
            json!({"config": {"numCpu": 4}, "runtime": {"powerState": "poweredOn"}}),
            &[net],
        );
        let objects = snapshot(&mock).await;

        let err = sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap_err();

        assert!(matches!(
            err,
            ControllerError::FieldExtraction { ref path, .. } if path == "summary.config.memorySizeMB"
        ));
        assert!(mock.property_requests().is_empty(), "aborts before resolving networks");
    }

    #[tokio::test]
    async fn test_malformed_network_object_is_field_extraction() {
        let mock = Arc::new(MockVSphereClient::new());
        let reference = ManagedObjectReference::new("Network", "network-9");
        mock.set_properties(reference.clone(), [("name", json!("VM Network"))]);
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[reference]);
        let objects = snapshot(&mock).await;

        let err = sync(mock.as_ref(), &node_info("a", "node-a"), &objects).await.unwrap_err();

        assert!(matches!(err, ControllerError::FieldExtraction { ref path, .. } if path == "overallStatus"));
    }

    /// Direct fields come from the snapshot while networks are resolved
    /// live, so a change between the two shows up as a mixed record.
    #[tokio::test]
    async fn test_status_may_mix_snapshots() {
        let mock = Arc::new(MockVSphereClient::new());
        let net = add_standard_network(&mock, "network-7", "VM Network", "green");
        add_vm(&mock, "vm-1", "node-a", vm_summary(4, 8192, "poweredOn"), &[net]);
        let stale = snapshot(&mock).await;

        // Inventory changes after the bulk retrieval
        add_vm(
            &mock,
            "vm-1",
            "node-a",
            vm_summary(8, 16384, "poweredOff"),
            &[ManagedObjectReference::new("Network", "network-7")],
        );
        add_standard_network(&mock, "network-7", "VM Network (renamed)", "red");

        let record = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &stale).await.unwrap());

        assert_eq!(record.get("vmTotalCPU"), Some(&StatusValue::Int(4)), "from the old snapshot");
        assert_eq!(record.get("vmPowerState"), Some(&StatusValue::from("poweredOn")));
        assert_eq!(record.get("netName"), Some(&StatusValue::from("VM Network (renamed)")), "from the new state");
        assert_eq!(record.get("netOverallStatus"), Some(&StatusValue::from("red")));

        let fresh = snapshot(&mock).await;
        let record = matched(sync(mock.as_ref(), &node_info("a", "node-a"), &fresh).await.unwrap());
        assert_eq!(record.get("vmTotalCPU"), Some(&StatusValue::Int(8)));
    }
}

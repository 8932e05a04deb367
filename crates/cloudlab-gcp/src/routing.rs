//! Geo routing policy data

use std::collections::BTreeMap;

/// Render `region=ip[,ip];region=ip` for `--routing-policy-data`.
///
/// Regions are emitted in sorted order so the argument is stable.
pub fn routing_policy_data(addresses: &BTreeMap<String, Vec<String>>) -> String {
    addresses
        .iter()
        .filter(|(_, ips)| !ips.is_empty())
        .map(|(region, ips)| format!("{}={}", region, ips.join(",")))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_data() {
        let mut addresses = BTreeMap::new();
        addresses.insert("us-east1".to_string(), vec!["10.142.0.2".to_string()]);
        addresses.insert(
            "europe-west2".to_string(),
            vec!["10.154.0.2".to_string(), "10.154.0.3".to_string()],
        );
        addresses.insert("asia-south1".to_string(), vec![]);

        assert_eq!(
            routing_policy_data(&addresses),
            "europe-west2=10.154.0.2,10.154.0.3;us-east1=10.142.0.2"
        );
    }
}

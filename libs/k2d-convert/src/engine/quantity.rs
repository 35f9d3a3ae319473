//! Kubernetes resource `Quantity` parsing, just enough for the conversions
//! the adapter needs: CPU (to milli-cores) and memory (to bytes).

/// Parse a CPU quantity string (e.g. `"500m"`, `"2"`, `"0.5"`) into milli-cores.
pub fn cpu_millis(quantity: &str) -> Option<i64> {
    if let Some(milli) = quantity.strip_suffix('m') {
        return milli.parse::<f64>().ok().map(|v| v.round() as i64);
    }
    quantity.parse::<f64>().ok().map(|v| (v * 1000.0).round() as i64)
}

/// Parse a memory quantity string (e.g. `"128Mi"`, `"1G"`, `"512"`) into bytes.
pub fn memory_bytes(quantity: &str) -> Option<i64> {
    const BINARY: &[(&str, i64)] = &[
        ("Ki", 1024),
        ("Mi", 1024i64.pow(2)),
        ("Gi", 1024i64.pow(3)),
        ("Ti", 1024i64.pow(4)),
        ("Pi", 1024i64.pow(5)),
        ("Ei", 1024i64.pow(6)),
    ];
    const DECIMAL: &[(&str, i64)] = &[
        ("k", 1_000),
        ("K", 1_000),
        ("M", 1_000i64.pow(2)),
        ("G", 1_000i64.pow(3)),
        ("T", 1_000i64.pow(4)),
        ("P", 1_000i64.pow(5)),
        ("E", 1_000i64.pow(6)),
    ];
    for (suffix, multiplier) in BINARY.iter().chain(DECIMAL.iter()) {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number
                .parse::<f64>()
                .ok()
                .map(|v| (v * *multiplier as f64).round() as i64);
        }
    }
    quantity.parse::<f64>().ok().map(|v| v.round() as i64)
}

/// CPU milli-cores to Docker-style cpu-shares, matching the kubelet's own formula.
pub fn millis_to_cpu_shares(millis: i64) -> i64 {
    std::cmp::max(2, millis * 1024 / 1000)
}

/// CPU milli-cores to nano-CPUs (the unit the engine's CPU quota API expects).
pub fn millis_to_nano_cpus(millis: i64) -> i64 {
    millis * 1_000_000
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_millicores() {
        assert_eq!(cpu_millis("500m"), Some(500));
        assert_eq!(cpu_millis("2"), Some(2000));
        assert_eq!(cpu_millis("0.5"), Some(500));
    }

    #[test]
    fn parses_memory_suffixes() {
        assert_eq!(memory_bytes("128Mi"), Some(128 * 1024 * 1024));
        assert_eq!(memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(memory_bytes("512"), Some(512));
    }

    #[test]
    fn converts_millis_to_shares_and_nano_cpus() {
        assert_eq!(millis_to_cpu_shares(500), 512);
        assert_eq!(millis_to_cpu_shares(1), 2);
        assert_eq!(millis_to_nano_cpus(500), 500_000_000);
    }
}

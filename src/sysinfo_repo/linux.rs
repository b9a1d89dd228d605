// Linux-specific helpers: established TCP sockets from /proc/net and their owning PIDs.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use super::SocketEntry;
use crate::probe::ProbeError;

/// `st` column value for TCP_ESTABLISHED.
const TCP_ESTABLISHED: &str = "01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RawSocket {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub inode: u64,
}

/// Established sockets from /proc/net/tcp and /proc/net/tcp6, IPv4 first.
pub(super) fn established_sockets() -> Result<Vec<SocketEntry>, ProbeError> {
    #[cfg(target_os = "linux")]
    {
        let tcp = std::fs::read_to_string("/proc/net/tcp")
            .map_err(|e| ProbeError::Capability(format!("read /proc/net/tcp: {}", e)))?;
        let mut raw = parse_proc_net_tcp(&tcp);
        // tcp6 is absent when IPv6 is disabled.
        match std::fs::read_to_string("/proc/net/tcp6") {
            Ok(tcp6) => raw.extend(parse_proc_net_tcp(&tcp6)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ProbeError::Capability(format!("read /proc/net/tcp6: {}", e)));
            }
        }
        let owners = socket_owners();
        Ok(raw
            .into_iter()
            .map(|s| SocketEntry {
                pid: owners.get(&s.inode).copied(),
                local: s.local,
                remote: Some(s.remote),
            })
            .collect())
    }
    #[cfg(not(target_os = "linux"))]
    Err(ProbeError::Unsupported("connection enumeration"))
}

/// Socket inode -> owning PID, from the /proc/<pid>/fd links we are allowed to read.
#[cfg(target_os = "linux")]
fn socket_owners() -> HashMap<u64, u32> {
    let mut owners = HashMap::new();
    let Ok(proc_dir) = std::fs::read_dir("/proc") else {
        return owners;
    };
    for entry in proc_dir.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = std::fs::read_link(fd.path())
                && let Some(inode) = target.to_str().and_then(socket_inode)
            {
                owners.entry(inode).or_insert(pid);
            }
        }
    }
    owners
}

/// Inode from an fd link target such as `socket:[12345]`.
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Established entries of a /proc/net/tcp{,6} table. Malformed lines are skipped.
pub(super) fn parse_proc_net_tcp(content: &str) -> Vec<RawSocket> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 10 || cols[3] != TCP_ESTABLISHED {
                return None;
            }
            Some(RawSocket {
                local: parse_hex_socket(cols[1])?,
                remote: parse_hex_socket(cols[2])?,
                inode: cols[9].parse().ok()?,
            })
        })
        .collect()
}

/// `0100007F:0035` -> 127.0.0.1:53. Address words are in host byte order.
fn parse_hex_socket(s: &str) -> Option<SocketAddr> {
    let (addr, port) = s.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    let ip = match addr.len() {
        8 => IpAddr::V4(Ipv4Addr::from(
            u32::from_str_radix(addr, 16).ok()?.to_ne_bytes(),
        )),
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_mut(4).enumerate() {
                let word = u32::from_str_radix(&addr[i * 8..i * 8 + 8], 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

#[cfg(test)]
#[cfg(target_endian = "little")]
mod tests {
    use super::*;

    const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:0035 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1234 1 0000000000000000 100 0 0 10 0
   1: 0F02000A:C350 2290D9AC:01BB 01 00000000:00000000 02:000A7D6A 00000000  1000        0 56789 2 0000000000000000 20 4 30 10 -1
   2: garbage
";

    const TCP6: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000001000000:A1B2 00000000000000000000000001000000:0016 01 00000000:00000000 00:00000000 00000000  1000        0 99 1 0000000000000000 20 4 0 10 -1
";

    #[test]
    fn parses_established_ipv4_rows_only() {
        let rows = parse_proc_net_tcp(TCP);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].local, "10.0.2.15:50000".parse().unwrap());
        assert_eq!(rows[0].remote, "172.217.144.34:443".parse().unwrap());
        assert_eq!(rows[0].inode, 56789);
    }

    #[test]
    fn parses_ipv6_rows() {
        let rows = parse_proc_net_tcp(TCP6);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].local, "[::1]:41394".parse().unwrap());
        assert_eq!(rows[0].remote, "[::1]:22".parse().unwrap());
        assert_eq!(rows[0].inode, 99);
    }

    #[test]
    fn socket_inode_from_fd_link() {
        assert_eq!(socket_inode("socket:[12345]"), Some(12345));
        assert_eq!(socket_inode("pipe:[12345]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
    }
}

//! WhatsApp order handoff: the pre-filled chat message sent to a branch.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    #[default]
    Purwakarta,
    Wanayasa,
}

impl Branch {
    pub fn label(&self) -> &'static str {
        match self {
            Branch::Purwakarta => "Cabang Purwakarta",
            Branch::Wanayasa => "Cabang Wanayasa",
        }
    }

    pub fn whatsapp_number<'a>(&self, config: &'a AppConfig) -> &'a str {
        match self {
            Branch::Purwakarta => &config.whatsapp_purwakarta,
            Branch::Wanayasa => &config.whatsapp_wanayasa,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandoffLine {
    pub name: String,
    pub option: Option<String>,
    pub note: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone)]
pub struct Buyer<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HandoffSnapshot {
    pub branch: Branch,
    pub whatsapp_number: String,
    pub message: String,
    pub link: String,
}

/// Formats rupiah amounts with `.` as the thousands separator.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if amount < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn line_label(idx: usize) -> String {
    // A..Z, then AA, AB, ...
    let mut n = idx;
    let mut label = Vec::new();
    loop {
        label.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.iter().rev().collect()
}

pub fn compose_message(
    branch: Branch,
    lines: &[HandoffLine],
    subtotal: i64,
    discount: i64,
    total: i64,
    buyer: &Buyer<'_>,
) -> String {
    let items = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let option = line
                .option
                .as_deref()
                .map(|o| format!(" \"{o}\""))
                .unwrap_or_default();
            let mut block = vec![
                format!("{}. {}{}", line_label(idx), line.name, option),
                format!(
                    "   Jumlah {} • Rp {}",
                    line.quantity,
                    format_rupiah(line.unit_price * i64::from(line.quantity))
                ),
            ];
            if let Some(note) = line.note.as_deref() {
                block.push(format!("   Catatan: {note}"));
            }
            block.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n");

    [
        "Halo ZonaPrint,".to_string(),
        format!("Saya ingin memesan ({}):", branch.label()),
        items,
        String::new(),
        format!("Subtotal: Rp {}", format_rupiah(subtotal)),
        format!("Voucher: Rp {}", format_rupiah(discount)),
        format!("Total: Rp {}", format_rupiah(total)),
        String::new(),
        format!("Nama: {}", buyer.name),
        format!("Email: {}", buyer.email),
        format!("Telepon: {}", buyer.phone.unwrap_or("-")),
        format!("Alamat: {}", buyer.address.unwrap_or("-")),
        String::new(),
        "Saya akan mengirimkan file desain (PNG, PDF, dan format lainnya) melalui chat ini."
            .to_string(),
    ]
    .join("\n")
}

pub fn snapshot(config: &AppConfig, branch: Branch, message: String) -> HandoffSnapshot {
    let number = branch.whatsapp_number(config).to_string();
    let link = format!("https://wa.me/{}?text={}", number, urlencoding::encode(&message));
    HandoffSnapshot {
        branch,
        whatsapp_number: number,
        message,
        link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_uses_dot_separators() {
        assert_eq!(format_rupiah(0), "0");
        assert_eq!(format_rupiah(950), "950");
        assert_eq!(format_rupiah(25_000), "25.000");
        assert_eq!(format_rupiah(1_234_567), "1.234.567");
        assert_eq!(format_rupiah(-75_000), "-75.000");
    }

    #[test]
    fn labels_continue_past_z() {
        assert_eq!(line_label(0), "A");
        assert_eq!(line_label(25), "Z");
        assert_eq!(line_label(26), "AA");
        assert_eq!(line_label(27), "AB");
    }

    #[test]
    fn message_lists_items_and_totals() {
        let lines = vec![
            HandoffLine {
                name: "Banner".into(),
                option: Some("1x2m".into()),
                note: Some("warna cerah".into()),
                quantity: 2,
                unit_price: 50_000,
            },
            HandoffLine {
                name: "Stiker".into(),
                option: None,
                note: None,
                quantity: 1,
                unit_price: 10_000,
            },
        ];
        let buyer = Buyer {
            name: "Sari",
            email: "sari@example.com",
            phone: Some("0812"),
            address: None,
        };
        let msg = compose_message(Branch::Wanayasa, &lines, 110_000, 25_000, 85_000, &buyer);

        assert!(msg.starts_with("Halo ZonaPrint,\nSaya ingin memesan (Cabang Wanayasa):"));
        assert!(msg.contains("A. Banner \"1x2m\"\n   Jumlah 2 • Rp 100.000\n   Catatan: warna cerah"));
        assert!(msg.contains("B. Stiker\n   Jumlah 1 • Rp 10.000"));
        assert!(msg.contains("Voucher: Rp 25.000\nTotal: Rp 85.000"));
        assert!(msg.contains("Alamat: -"));
    }
}

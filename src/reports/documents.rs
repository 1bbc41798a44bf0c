//! Renders report rows and invoices into downloadable files.

use time::{macros::format_description, OffsetDateTime};

use super::csv::CsvWriter;
use super::pdf::{row, Align, PdfDocument, LINE_CHARS};
use super::repo::{InventoryRow, OrderReportRow};
use crate::config::STORE_OFFSET;
use crate::money::format_rupiah;
use crate::orders::repo_types::{Order, OrderItem};

pub fn format_local(at: OffsetDateTime) -> String {
    at.to_offset(STORE_OFFSET)
        .format(format_description!("[day]/[month]/[year] [hour]:[minute]"))
        .unwrap_or_default()
}

pub fn orders_csv(rows: &[OrderReportRow]) -> Vec<u8> {
    let mut w = CsvWriter::new();
    w.row([
        "Kode Pesanan",
        "Tanggal",
        "Username",
        "Penerima",
        "Status",
        "Metode Pembayaran",
        "Jumlah Barang",
        "Total (Rp)",
    ]);
    for r in rows {
        w.row([
            r.code.clone(),
            format_local(r.created_at),
            r.username.clone(),
            r.recipient_name.clone(),
            r.status.label().to_string(),
            r.payment_method.label().to_string(),
            r.item_count.to_string(),
            r.total.to_string(),
        ]);
    }
    let grand: i64 = rows.iter().map(|r| r.total).sum();
    w.row(["", "", "", "", "", "", "Grand Total", grand.to_string().as_str()]);
    w.into_bytes()
}

pub fn products_csv(rows: &[InventoryRow]) -> Vec<u8> {
    let mut w = CsvWriter::new();
    w.row([
        "Produk",
        "Merek",
        "Aktif",
        "SKU",
        "Prosesor",
        "RAM (GB)",
        "Penyimpanan",
        "Layar (inci)",
        "Harga (Rp)",
        "Stok",
    ]);
    for r in rows {
        w.row([
            r.product_name.clone(),
            r.brand.clone(),
            if r.is_active { "Ya" } else { "Tidak" }.to_string(),
            r.sku.clone(),
            r.processor.clone(),
            r.ram_gb.to_string(),
            format!("{}GB {}", r.storage_gb, r.storage_type),
            r.screen_inches.to_string(),
            r.price.to_string(),
            r.stock.to_string(),
        ]);
    }
    w.into_bytes()
}

/// Tabular order report with a grand total.
pub fn orders_pdf(store_name: &str, period: &str, rows: &[OrderReportRow]) -> Vec<u8> {
    let mut doc = PdfDocument::new();
    doc.footer(format!("{store_name} - Laporan Pesanan"))
        .heading(format!("{store_name} - Laporan Pesanan"))
        .line(format!("Periode: {period}"))
        .line(format!("Dicetak: {}", format_local(OffsetDateTime::now_utc())))
        .blank();

    let header = row(&[
        ("Kode", 19, Align::Left),
        ("Tanggal", 16, Align::Left),
        ("Pelanggan", 14, Align::Left),
        ("Status", 19, Align::Left),
        ("Total", 16, Align::Right),
    ]);
    doc.bold(header).rule();

    for r in rows {
        let date = format_local(r.created_at);
        let total = format_rupiah(r.total);
        doc.line(row(&[
            (r.code.as_str(), 19, Align::Left),
            (date.as_str(), 16, Align::Left),
            (r.username.as_str(), 14, Align::Left),
            (r.status.label(), 19, Align::Left),
            (total.as_str(), 16, Align::Right),
        ]));
    }

    let grand: i64 = rows.iter().map(|r| r.total).sum();
    doc.rule();
    doc.bold(row(&[
        (format!("Jumlah pesanan: {}", rows.len()).as_str(), 45, Align::Left),
        ("Grand Total", 22, Align::Right),
        (format_rupiah(grand).as_str(), 19, Align::Right),
    ]));
    doc.render()
}

pub fn invoice_pdf(
    store_name: &str,
    order: &Order,
    items: &[OrderItem],
    buyer_username: Option<&str>,
) -> Vec<u8> {
    let mut doc = PdfDocument::new();
    doc.footer(format!("{store_name} - Invoice {}", order.code))
        .heading(format!("{store_name} - INVOICE"))
        .blank()
        .line(format!("No. Invoice : {}", order.code))
        .line(format!("Tanggal     : {}", format_local(order.created_at)))
        .line(format!("Status      : {}", order.status))
        .line(format!("Pembayaran  : {}", order.payment_method.label()));
    if let Some(reference) = order.payment_reference.as_deref() {
        doc.line(format!("Referensi   : {reference}"));
    }
    doc.blank()
        .bold("Dikirim kepada")
        .line(match buyer_username {
            Some(u) => format!("{} ({u})", order.recipient_name),
            None => order.recipient_name.clone(),
        })
        .line(order.phone.clone());
    for part in wrap(&order.shipping_address, LINE_CHARS) {
        doc.line(part);
    }
    if let Some(note) = order.note.as_deref() {
        doc.line(format!("Catatan: {note}"));
    }
    doc.blank();

    doc.bold(row(&[
        ("Barang", 46, Align::Left),
        ("Qty", 4, Align::Right),
        ("Harga", 16, Align::Right),
        ("Subtotal", 17, Align::Right),
    ]))
    .rule();
    for item in items {
        let price = format_rupiah(item.unit_price);
        let subtotal = format_rupiah(item.line_total());
        let qty = item.quantity.to_string();
        doc.line(row(&[
            (item.product_name.as_str(), 46, Align::Left),
            (qty.as_str(), 4, Align::Right),
            (price.as_str(), 16, Align::Right),
            (subtotal.as_str(), 17, Align::Right),
        ]));
        doc.line(format!("  {}", item.variant_label));
    }
    doc.rule().bold(row(&[
        ("Total", 67, Align::Right),
        (format_rupiah(order.total).as_str(), 17, Align::Right),
    ]));
    if let Some(reason) = order.cancel_reason.as_deref() {
        doc.blank().line(format!("Alasan pembatalan: {reason}"));
    }
    doc.render()
}

/// Greedy word wrap to `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::status::{OrderStatus, PaymentMethod};
    use time::macros::datetime;
    use uuid::Uuid;

    fn report_row(code: &str, total: i64) -> OrderReportRow {
        OrderReportRow {
            code: code.into(),
            created_at: datetime!(2024-05-01 03:00 UTC),
            username: "budi".into(),
            recipient_name: "Budi, S.Kom".into(),
            status: OrderStatus::Selesai,
            payment_method: PaymentMethod::Wallet,
            item_count: 2,
            total,
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn local_time_is_wib() {
        assert_eq!(format_local(datetime!(2024-05-01 18:30 UTC)), "02/05/2024 01:30");
    }

    #[test]
    fn orders_csv_has_header_rows_and_total() {
        let out = text(orders_csv(&[
            report_row("INV-20240501-AAAAAA", 1_000),
            report_row("INV-20240501-BBBBBB", 2_500),
        ]));
        let lines: Vec<&str> = out.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert!(lines[0].starts_with("Kode Pesanan,Tanggal"));
        assert_eq!(
            lines[1],
            "INV-20240501-AAAAAA,01/05/2024 10:00,budi,\"Budi, S.Kom\",Selesai,Saldo,2,1000"
        );
        assert_eq!(lines[3], ",,,,,,Grand Total,3500");
    }

    #[test]
    fn products_csv_lists_variants() {
        let out = text(products_csv(&[InventoryRow {
            product_name: "ThinkPad X1".into(),
            brand: "Lenovo".into(),
            is_active: true,
            sku: "TPX1-16-512".into(),
            processor: "Intel Core i7-1365U".into(),
            ram_gb: 16,
            storage_gb: 512,
            storage_type: "SSD".into(),
            screen_inches: 14.0,
            price: 25_000_000,
            stock: 3,
        }]));
        assert!(out.contains("ThinkPad X1,Lenovo,Ya,TPX1-16-512,Intel Core i7-1365U,16,512GB SSD,14,25000000,3"));
    }

    #[test]
    fn orders_pdf_shows_grand_total() {
        let out = text(orders_pdf(
            "Toko Laptop",
            "01/05/2024 - 31/05/2024",
            &[report_row("INV-1", 12_500_000), report_row("INV-2", 500_000)],
        ));
        assert!(out.starts_with("%PDF-1.4"));
        assert!(out.contains("Grand Total"));
        assert!(out.contains("Rp 13.000.000"));
        assert!(out.contains("Jumlah pesanan: 2"));
    }

    #[test]
    fn invoice_lists_items() {
        let order = Order {
            id: Uuid::new_v4(),
            code: "INV-20240501-XYZ123".into(),
            user_id: Uuid::new_v4(),
            status: OrderStatus::Diproses,
            payment_method: PaymentMethod::Gateway,
            payment_reference: Some("PAY-77".into()),
            recipient_name: "Sari".into(),
            phone: "081200000000".into(),
            shipping_address: "Jl. Sudirman (Gedung A) 5".into(),
            note: None,
            total: 20_000_000,
            cancel_reason: None,
            created_at: datetime!(2024-05-01 03:00 UTC),
            updated_at: datetime!(2024-05-01 03:00 UTC),
        };
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            variant_id: Uuid::new_v4(),
            product_name: "Asus Zenbook 14".into(),
            variant_label: "AMD Ryzen 7 / 16GB".into(),
            unit_price: 10_000_000,
            quantity: 2,
        };
        let out = text(invoice_pdf("Toko Laptop", &order, &[item], Some("sari")));
        assert!(out.contains("INV-20240501-XYZ123"));
        assert!(out.contains("Referensi   : PAY-77"));
        assert!(out.contains("Sari \\(sari\\)"));
        assert!(out.contains("Gedung A\\)"));
        assert!(out.contains("Rp 20.000.000"));
    }

    #[test]
    fn wrap_splits_on_words() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert!(wrap("   ", 5).is_empty());
    }
}

// 二维码生成工具
// 网关未返回二维码时，根据收银台链接在本地生成

use qrcode::QrCode;
use image::Luma;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use anyhow::{Result, Context};

/// 生成支付二维码
///
/// # Arguments
/// * `payment_url` - 收银台支付链接
///
/// # Returns
/// * data URI 形式的 Base64 PNG 图片
pub fn generate_payment_qr_code(payment_url: &str) -> Result<String> {
    let qr_code = QrCode::new(payment_url.as_bytes())
        .context("Failed to create QR code")?;

    let image = qr_code.render::<Luma<u8>>()
        .min_dimensions(200, 200)
        .build();

    let mut png_data = Vec::new();
    {
        use image::codecs::png::PngEncoder;
        use image::ImageEncoder;

        let encoder = PngEncoder::new(&mut png_data);
        encoder.write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::L8,
        )
        .context("Failed to encode PNG")?;
    }

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png_data)))
}

//! Fixture PDFs built with lopdf.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, RgbImage};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{
    content::Content, content::Operation, dictionary, Dictionary, Document, Object, Stream,
    StringFormat,
};

/// Password padding string of the standard security handler.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// A simple PDF with N pages, each showing "Page <n>".
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = build_document(num_pages, None);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A one-page PDF whose page draws a single high-quality JPEG image.
pub fn create_pdf_with_jpeg(width: u32, height: u32) -> Vec<u8> {
    create_pdf_with_jpeg_as(width, height, "DeviceRGB")
}

/// Like [`create_pdf_with_jpeg`], but the image dictionary claims
/// `color_space`. The JPEG data itself is always three-component RGB.
pub fn create_pdf_with_jpeg_as(width: u32, height: u32, color_space: &str) -> Vec<u8> {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        // Noisy gradient so the JPEG is not trivially small
        let noise = ((x * 7919 + y * 104729) % 61) as u8;
        *pixel = image::Rgb([(x % 256) as u8 ^ noise, (y % 256) as u8, noise.wrapping_mul(3)]);
    }

    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, 100)
        .encode_image(&img)
        .unwrap();

    let image = JpegImage {
        width,
        height,
        color_space: color_space.to_string(),
        data: jpeg.into_inner(),
    };
    let mut doc = build_document(1, Some(image));
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A PDF with N pages protected by the standard security handler with 40-bit
/// RC4 (V 1, R 2). `password` is the user password.
pub fn create_encrypted_pdf(num_pages: u32, password: &str) -> Vec<u8> {
    let mut doc = build_document(num_pages, None);
    let file_id = Object::String(b"pdftools-fixture".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "P" => -44,
        "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);

    // R2 stores the padding string encrypted with the file key as /U
    let key = get_encryption_key(&doc, password, false).unwrap();
    let check = rc4(&key, &PASSWORD_PAD);
    doc.get_object_mut(encrypt_id)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("U", Object::String(check, StringFormat::Hexadecimal));

    // RC4 is symmetric, so the per-object "decryption" encrypts plaintext
    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id || object.as_stream().is_err() {
            continue;
        }
        let ciphertext = decrypt_object(&key, id, object).unwrap();
        if let Object::Stream(stream) = object {
            stream.set_content(ciphertext);
        }
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A PDF carrying an AES-256 (V 5, R 6) encryption dictionary, a scheme the
/// PDF library cannot decrypt. The content itself is left in the clear.
pub fn create_pdf_with_aes_dictionary(num_pages: u32) -> Vec<u8> {
    let mut doc = build_document(num_pages, None);
    let file_id = Object::String(b"pdftools-aes".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 5,
        "R" => 6,
        "Length" => 256,
        "P" => -4,
        "O" => Object::String(vec![0x11; 48], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0x22; 48], StringFormat::Hexadecimal),
        "OE" => Object::String(vec![0x33; 32], StringFormat::Hexadecimal),
        "UE" => Object::String(vec![0x44; 32], StringFormat::Hexadecimal),
        "Perms" => Object::String(vec![0x55; 16], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
            byte ^ k
        })
        .collect()
}

struct JpegImage {
    width: u32,
    height: u32,
    color_space: String,
    data: Vec<u8>,
}

fn build_document(num_pages: u32, image: Option<JpegImage>) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let image_id = image.map(|image| {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => Object::Name(image.color_space.into_bytes()),
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let mut stream = Stream::new(dict, image.data);
        stream.allows_compression = false;
        doc.add_object(stream)
    });

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new(
                "Tj",
                vec![Object::string_literal(format!("Page {}", i + 1))],
            ),
            Operation::new("ET", vec![]),
        ];

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if let Some(image_id) = image_id {
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![200.into(), 0.into(), 0.into(), 200.into(), 100.into(), 400.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
            resources.set("XObject", dictionary! { "Im1" => image_id });
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => num_pages as i64,
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

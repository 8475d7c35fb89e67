//! Scene-graph construction from the chunk stream.
//!
//! Decoding runs in two passes: a scan pass that only locates the settings
//! block (so the `debug` flag is known before anything is logged), then the
//! main pass building materials, meshes, sources and listeners in file
//! order. Materials must precede the meshes referring to them.

use crate::reader::{Reader, Tag, TAG_FLT4, TAG_INT4, TAG_STR, TAG_TRI, TAG_VEC3};
use aural_core::animation::{Animated, Keyframes, Track};
use aural_core::base::Float;
use aural_core::config::{Config, Value};
use aural_core::error::{EngineError, Result};
use aural_core::geometry::{Point3f, Vector3f};
use aural_core::material::Material;
use aural_core::mesh::Mesh;
use aural_core::scene::Scene;
use aural_core::source::{SoundSource, SourcePosition, DEFAULT_CROSSOVER};
use aural_core::triangle::Triangle;
use aural_core::wav;
use std::collections::HashMap;

/// A fully decoded scene container.
pub struct Decoded {
    /// The settings block.
    pub config: Config,

    /// The keyframe table, when the scene is animated.
    pub keyframes: Option<Keyframes>,

    /// The scene graph.
    pub scene: Scene,
}

/// Decodes a scene container from a file.
///
/// * `path` - The file to read.
pub fn decode_file(path: &str) -> Result<Decoded> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Decodes a scene container from bytes.
///
/// * `bytes` - The container contents.
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    if bytes.len() < 4 || &bytes[..4] != b".EAR" {
        return Err(EngineError::Decode("missing .EAR signature".to_owned()));
    }
    let body = &bytes[4..];

    let config = scan_settings(body)?;
    let debug = config.contains("debug") && config.bool("debug")?;

    let parser = Parser {
        debug,
        crossover: DEFAULT_CROSSOVER,
        keyframes: None,
        scene: Scene::new(),
    };
    parser.parse(body, config)
}

/// Locates and parses the settings block ahead of the main pass.
fn scan_settings(body: &[u8]) -> Result<Config> {
    let mut r = Reader::new(body);
    while let Some(tag) = r.peek_tag() {
        if &tag == b"SET " {
            let mut block = r.block(*b"SET ")?;
            return parse_settings(&mut block);
        }
        skip_chunk(&mut r)?;
    }
    Err(EngineError::Decode(
        "no settings block found in file".to_owned(),
    ))
}

fn parse_settings(block: &mut Reader) -> Result<Config> {
    let mut values = HashMap::new();
    while block.peek_tag() == Some(TAG_STR) {
        let key = block.read_str()?;
        let value = match block.peek_tag() {
            Some(TAG_INT4) => Value::Int(block.read_i32()?),
            Some(TAG_FLT4) => Value::Float(block.read_f32()?),
            Some(TAG_VEC3) => Value::Vec3(block.read_vec3()?),
            Some(TAG_STR) => Value::Str(block.read_str()?),
            _ => {
                return Err(EngineError::Decode(format!(
                    "unsupported value type for setting '{key}'"
                )))
            }
        };
        values.insert(key, value);
    }
    Ok(Config::new(values))
}

/// Skips one chunk of any kind.
fn skip_chunk(r: &mut Reader) -> Result<()> {
    match r.peek_tag() {
        Some(TAG_FLT4) => drop(r.read_f32()?),
        Some(TAG_INT4) => drop(r.read_i32()?),
        Some(TAG_STR) => drop(r.read_str()?),
        Some(TAG_VEC3) => drop(r.read_vec3()?),
        Some(TAG_TRI) => drop(r.read_tri()?),
        Some(_) => drop(r.skip_block()?),
        None => {}
    }
    Ok(())
}

struct Parser {
    debug: bool,
    crossover: [Float; 3],
    keyframes: Option<Keyframes>,
    scene: Scene,
}

impl Parser {
    fn trace(&self, tag: &Tag) {
        let tag = String::from_utf8_lossy(tag);
        if self.debug {
            info!("Reading '{tag}' block");
        } else {
            debug!("Reading '{tag}' block");
        }
    }

    fn parse(mut self, body: &[u8], config: Config) -> Result<Decoded> {
        let mut r = Reader::new(body);
        while let Some(tag) = r.peek_tag() {
            self.trace(&tag);
            match &tag {
                b"SET " | b"VRSN" => {
                    r.skip_block()?;
                }
                b"KEYS" => self.parse_keyframes(&mut r)?,
                b"FREQ" => {
                    let mut block = r.block(*b"FREQ")?;
                    self.crossover = [
                        block.read_f32()?,
                        block.read_f32()?,
                        block.read_f32()?,
                    ];
                }
                b"MAT " => self.parse_material(&mut r)?,
                b"MESH" => self.parse_mesh(&mut r)?,
                b"OUT1" => self.parse_mono_listener(&mut r)?,
                b"OUT2" => self.parse_stereo_listener(&mut r)?,
                b"SSRC" | b"ssrc" => self.parse_source(&mut r, tag, false)?,
                b"3SRC" | b"3src" => self.parse_source(&mut r, tag, true)?,
                _ => {
                    warn!("Unknown block '{}'", String::from_utf8_lossy(&tag));
                    skip_chunk(&mut r)?;
                }
            }
        }

        // The crossover block applies to every source in the file, no
        // matter where it appears relative to them.
        for source in &mut self.scene.sources {
            source.set_crossover(self.crossover);
        }

        Ok(Decoded {
            config,
            keyframes: self.keyframes,
            scene: self.scene,
        })
    }

    fn parse_keyframes(&mut self, r: &mut Reader) -> Result<()> {
        let mut block = r.block(*b"KEYS")?;
        let mut keys = Vec::new();
        while block.remaining() >= 8 {
            keys.push(block.read_f32()?);
        }
        info!("Keyframes: {}", keys.len());
        self.keyframes = Some(Keyframes::new(keys));
        Ok(())
    }

    fn parse_material(&mut self, r: &mut Reader) -> Result<()> {
        let mut block = r.block(*b"MAT ")?;
        let name = block.read_str()?;

        let mut reflection = [0.0; 3];
        for r in &mut reflection {
            *r = block.read_f32()?;
        }
        let mut refraction = None;
        if block.peek_tag() == Some(TAG_FLT4) {
            let mut t = [0.0; 3];
            for t in &mut t {
                *t = block.read_f32()?;
            }
            refraction = Some(t);
        }
        let mut specularity = None;
        if block.peek_tag() == Some(TAG_FLT4) {
            let mut s = [0.0; 3];
            for s in &mut s {
                *s = block.read_f32()?;
            }
            specularity = Some(s);
        }

        let material = Material::new(name, reflection, refraction, specularity)?;
        info!(
            "Material '{}': refl {:?}, absorp {:?}",
            material.name, material.reflection, material.absorption
        );
        self.scene.add_material(material);
        Ok(())
    }

    fn parse_triangles(block: &mut Reader, material: usize) -> Result<Vec<Triangle>> {
        let mut tris = Vec::new();
        while block.peek_tag() == Some(TAG_TRI) {
            let [a, b, c] = block.read_tri()?;
            tris.push(Triangle::new(a, b, c, material));
        }
        Ok(tris)
    }

    fn parse_mesh(&mut self, r: &mut Reader) -> Result<()> {
        let mut block = r.block(*b"MESH")?;
        let name = block.read_str()?;
        let material = self
            .scene
            .material_index(&name)
            .ok_or_else(|| EngineError::Reference(format!("material '{name}' not found")))?;
        let tris = Self::parse_triangles(&mut block, material)?;
        let mesh = Mesh::new(tris, &self.scene.materials);
        info!(
            "Mesh: {} faces, material '{name}', area {:.3}",
            mesh.tris.len(),
            mesh.area()
        );
        self.scene.add_mesh(mesh);
        Ok(())
    }

    fn parse_point_track(&self, block: &mut Reader) -> Result<Track<Point3f>> {
        if block.peek_tag() == Some(*b"anim") {
            let frames = self.parse_anim(block)?;
            let frames = frames
                .into_iter()
                .map(|v| Point3f::new(v.x, v.y, v.z))
                .collect();
            Ok(Track::Animated(Animated::new(frames)))
        } else {
            Ok(Track::Fixed(block.read_point3()?))
        }
    }

    fn parse_vector_track(&self, block: &mut Reader) -> Result<Track<Vector3f>> {
        if block.peek_tag() == Some(*b"anim") {
            Ok(Track::Animated(Animated::new(self.parse_anim(block)?)))
        } else {
            Ok(Track::Fixed(block.read_vec3()?))
        }
    }

    fn parse_anim(&self, r: &mut Reader) -> Result<Vec<Vector3f>> {
        let mut block = r.block(*b"anim")?;
        let keys = self
            .keyframes
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EngineError::Decode("keyframe data not read".to_owned()))?;
        let mut frames = Vec::new();
        while block.remaining() > 0 {
            frames.push(block.read_vec3()?);
        }
        if frames.len() != keys.len() {
            return Err(EngineError::Reference(
                "keyframe count does not match".to_owned(),
            ));
        }
        Ok(frames)
    }

    fn parse_mono_listener(&mut self, r: &mut Reader) -> Result<()> {
        let mut block = r.block(*b"OUT1")?;
        let filename = block.read_str()?;
        let _reserved = block.read_f32()?;
        let location = self.parse_point_track(&mut block)?;
        info!("Recorder (mono) -> '{filename}'");
        self.scene
            .add_listener(aural_core::listener::Listener::mono(filename, location));
        Ok(())
    }

    fn parse_stereo_listener(&mut self, r: &mut Reader) -> Result<()> {
        let mut block = r.block(*b"OUT2")?;
        let filename = block.read_str()?;
        let _reserved = block.read_f32()?;
        let location = self.parse_point_track(&mut block)?;
        let right_ear = self.parse_vector_track(&mut block)?;
        // Trailing head-model fields are carried by some writers; the
        // bounded block read drops them.
        info!("Recorder (stereo) -> '{filename}'");
        self.scene.add_listener(aural_core::listener::Listener::stereo(
            filename, location, right_ear,
        ));
        Ok(())
    }

    fn parse_source(&mut self, r: &mut Reader, tag: Tag, triple: bool) -> Result<()> {
        let mut block = r.block(tag)?;

        let mut paths = vec![block.read_str()?];
        if triple {
            paths.push(block.read_str()?);
            paths.push(block.read_str()?);
        }

        let position = match block.peek_tag() {
            Some(t) if &t == b"mesh" => {
                let mut mesh_block = block.block(*b"mesh")?;
                let tris = Self::parse_triangles(&mut mesh_block, 0)?;
                SourcePosition::Surface(Mesh::emitter(tris))
            }
            Some(t) if &t == b"anim" => SourcePosition::Point(self.parse_point_track(&mut block)?),
            _ => SourcePosition::Point(Track::Fixed(block.read_point3()?)),
        };

        let gain = if block.peek_tag() == Some(TAG_FLT4) {
            block.read_f32()?
        } else {
            1.0
        };
        let offset = if block.peek_tag() == Some(TAG_FLT4) {
            (block.read_f32()? * aural_core::base::SAMPLE_RATE as Float) as usize
        } else {
            0
        };

        let source = if triple {
            let mut bands = Vec::with_capacity(3);
            for path in &paths {
                bands.push(wav::load_mono(path)?);
            }
            let bands: [Vec<Float>; 3] = bands
                .try_into()
                .map_err(|_| EngineError::Decode("triple-band source load failed".to_owned()))?;
            SoundSource::triple_band(bands, position, gain, offset)
        } else {
            let data = wav::load_mono(&paths[0])?;
            SoundSource::mono(data, position, gain, offset, self.crossover)
        };

        info!(
            "Sound source: '{}', gain {gain}, offset {offset}",
            paths.join("', '")
        );
        self.scene.add_source(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_core::listener::ListenerKind;
    use aural_core::wav::Normalization;

    fn flt4(buf: &mut Vec<u8>, f: f32) {
        buf.extend_from_slice(b"flt4");
        buf.extend_from_slice(&f.to_le_bytes());
    }

    fn int4(buf: &mut Vec<u8>, i: i32) {
        buf.extend_from_slice(b"int4");
        buf.extend_from_slice(&i.to_le_bytes());
    }

    fn strc(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(b"str ");
        buf.extend_from_slice(s.as_bytes());
        let pad = 4 - s.len() % 4;
        buf.extend_from_slice(&vec![0; pad]);
    }

    fn vec3(buf: &mut Vec<u8>, x: f32, y: f32, z: f32) {
        buf.extend_from_slice(b"vec3");
        flt4(buf, x);
        flt4(buf, y);
        flt4(buf, z);
    }

    fn tri(buf: &mut Vec<u8>, verts: [[f32; 3]; 3]) {
        buf.extend_from_slice(b"tri ");
        for v in verts {
            vec3(buf, v[0], v[1], v[2]);
        }
    }

    fn block(buf: &mut Vec<u8>, tag: &[u8; 4], body: Vec<u8>) {
        buf.extend_from_slice(tag);
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&body);
    }

    fn settings_block(buf: &mut Vec<u8>) {
        let mut set = Vec::new();
        strc(&mut set, "samples");
        int4(&mut set, 100);
        strc(&mut set, "drylevel");
        flt4(&mut set, 1.0);
        strc(&mut set, "absorption");
        vec3(&mut set, 0.0, 0.01, 0.02);
        block(buf, b"SET ", set);
    }

    #[test]
    fn rejects_missing_signature() {
        assert!(decode(b"RIFFxxxx").is_err());
    }

    #[test]
    fn rejects_missing_settings() {
        let mut buf = b".EAR".to_vec();
        block(&mut buf, b"VRSN", {
            let mut b = Vec::new();
            int4(&mut b, 0);
            b
        });
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn decodes_settings_materials_meshes_and_listeners() {
        let mut buf = b".EAR".to_vec();
        settings_block(&mut buf);

        let mut mat = Vec::new();
        strc(&mut mat, "concrete");
        for _ in 0..3 {
            flt4(&mut mat, 0.7);
        }
        for _ in 0..3 {
            flt4(&mut mat, 0.1);
        }
        for _ in 0..3 {
            flt4(&mut mat, 0.5);
        }
        block(&mut buf, b"MAT ", mat);

        let mut mesh = Vec::new();
        strc(&mut mesh, "concrete");
        tri(&mut mesh, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        tri(&mut mesh, [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]]);
        block(&mut buf, b"MESH", mesh);

        let mut out1 = Vec::new();
        strc(&mut out1, "result.wav");
        flt4(&mut out1, 35.0);
        vec3(&mut out1, 1.0, 2.0, 3.0);
        block(&mut buf, b"OUT1", out1);

        let mut out2 = Vec::new();
        strc(&mut out2, "result-stereo.wav");
        flt4(&mut out2, 35.0);
        vec3(&mut out2, 0.0, 0.0, 0.0);
        vec3(&mut out2, 1.0, 0.0, 0.0);
        // Trailing head-model fields some writers add.
        flt4(&mut out2, 0.2);
        vec3(&mut out2, 0.1, 0.2, 0.3);
        block(&mut buf, b"OUT2", out2);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.config.int("samples").unwrap(), 100);
        assert_eq!(decoded.scene.materials.len(), 1);
        let m = &decoded.scene.materials[0];
        assert!((m.absorption[0] - 0.2).abs() < 1e-6);
        assert!((m.specularity[0] - 0.5).abs() < 1e-6);
        assert_eq!(decoded.scene.mesh.tris.len(), 2);
        assert_eq!(decoded.scene.listeners.len(), 2);
        assert!(matches!(decoded.scene.listeners[0].kind, ListenerKind::Mono));
        assert!(matches!(
            decoded.scene.listeners[1].kind,
            ListenerKind::Stereo { .. }
        ));
        assert_eq!(
            decoded.scene.listeners[0].location(None),
            Point3f::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn mesh_with_unknown_material_is_a_reference_error() {
        let mut buf = b".EAR".to_vec();
        settings_block(&mut buf);
        let mut mesh = Vec::new();
        strc(&mut mesh, "missing");
        block(&mut buf, b"MESH", mesh);
        assert!(matches!(
            decode(&buf),
            Err(EngineError::Reference(_))
        ));
    }

    #[test]
    fn animation_requires_matching_keyframe_count() {
        let mut buf = b".EAR".to_vec();
        settings_block(&mut buf);

        let mut keys = Vec::new();
        flt4(&mut keys, 0.0);
        flt4(&mut keys, 1.0);
        block(&mut buf, b"KEYS", keys);

        let mut anim = Vec::new();
        vec3(&mut anim, 0.0, 0.0, 0.0);
        // One frame instead of two.
        let mut out1 = Vec::new();
        strc(&mut out1, "result.wav");
        flt4(&mut out1, 35.0);
        block(&mut out1, b"anim", anim);
        block(&mut buf, b"OUT1", out1);

        assert!(matches!(decode(&buf), Err(EngineError::Reference(_))));
    }

    #[test]
    fn animated_listener_follows_the_keyframes() {
        let mut buf = b".EAR".to_vec();
        settings_block(&mut buf);

        let mut keys = Vec::new();
        flt4(&mut keys, 0.0);
        flt4(&mut keys, 1.0);
        block(&mut buf, b"KEYS", keys);

        let mut anim = Vec::new();
        vec3(&mut anim, -1.0, 0.0, 0.0);
        vec3(&mut anim, 1.0, 0.0, 0.0);
        let mut out1 = Vec::new();
        strc(&mut out1, "result.wav");
        flt4(&mut out1, 35.0);
        block(&mut out1, b"anim", anim);
        block(&mut buf, b"OUT1", out1);

        let decoded = decode(&buf).unwrap();
        let keys = decoded.keyframes.unwrap();
        assert_eq!(keys.len(), 2);
        let l = &decoded.scene.listeners[0];
        assert_eq!(l.location(Some(0)), Point3f::new(-1.0, 0.0, 0.0));
        assert_eq!(l.location(Some(1)), Point3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn decodes_a_mono_source_from_a_wav_file() {
        let wav_path = std::env::temp_dir().join(format!(
            "aural-decode-test-{}.wav",
            std::process::id()
        ));
        let samples: Vec<Float> = (0..64).map(|i| (i as Float / 64.0) - 0.5).collect();
        wav::save_mono(&wav_path, &samples, Normalization::Off).unwrap();

        let mut buf = b".EAR".to_vec();
        settings_block(&mut buf);
        let mut src = Vec::new();
        strc(&mut src, wav_path.to_str().unwrap());
        vec3(&mut src, 0.0, 0.0, 1.0);
        flt4(&mut src, 0.5); // gain
        flt4(&mut src, 0.25); // offset seconds
        block(&mut buf, b"SSRC", src);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.scene.sources.len(), 1);
        let s = &decoded.scene.sources[0];
        assert_eq!(s.gain, 0.5);
        assert_eq!(s.offset, 11_025);
        assert!(!s.is_surface());
        assert_eq!(s.location(None), Some(Point3f::new(0.0, 0.0, 1.0)));
        assert_eq!(s.band(0).data.len(), 64);

        std::fs::remove_file(&wav_path).ok();
    }
}

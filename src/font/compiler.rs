use super::definition::FontDefinition;
use super::origin::{BaselineResolver, DrawOrigin, OriginResolver};
use super::{GlyphIdentifier, GlyphSequence, ImageGlyph};
use crate::error::{Error, Result};
use crate::key::ResourceKey;
use crate::pack::{Pack, lookup};
use crate::texture;
use image::RgbaImage;
use log::{debug, trace};
use std::fmt;

pub const DEFAULT_GENERATED_NAMESPACE: &str = "packforge_generated";

// A height of -2 cancels the glyph's own advance, leaving it zero-width.
const LAYER_SPLIT_HEIGHT: i32 = -2;
const LAYER_SPLIT_ASCENT: i32 = -(i16::MAX as i32);
const LAYER_SPLIT_TEXTURE: &str = "split.png";

/// Turns draw calls into a [`GlyphSequence`], registering every glyph it
/// needs in the font of each target pack.
///
/// Horizontal placement is done with space glyphs around each image
/// (fonts have no x offset); vertical placement is the bitmap ascent.
pub struct GlyphCompiler<'a> {
    targets: Vec<(&'a mut Pack, FontDefinition)>,
    fallback: Option<&'a Pack>,
    generated_namespace: String,
    resolver: Box<dyn OriginResolver + 'a>,
    origin: DrawOrigin,
    output: Vec<GlyphIdentifier>,
    layer_split_written: bool,
}

impl fmt::Debug for GlyphCompiler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphCompiler")
            .field("font", &format_args!("{}", self.font()))
            .field("targets", &self.targets.len())
            .field("generated_namespace", &self.generated_namespace)
            .field("origin", &self.origin)
            .field("glyphs", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl<'a> GlyphCompiler<'a> {
    /// Open (or create) `font` in every target. Textures are looked up in
    /// the targets first, then in `fallback`.
    pub fn new(
        targets: Vec<&'a mut Pack>,
        fallback: Option<&'a Pack>,
        font: &ResourceKey,
        generated_namespace: &str,
    ) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::IllegalState(
                "a glyph compiler needs at least one target pack".to_string(),
            ));
        }
        // Fail early on a namespace that cannot form keys.
        ResourceKey::new(generated_namespace, LAYER_SPLIT_TEXTURE)?;
        let targets = targets
            .into_iter()
            .map(|pack| -> Result<_> {
                let def = FontDefinition::load_or_create(pack, font.clone())?;
                Ok((pack, def))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            targets,
            fallback,
            generated_namespace: generated_namespace.to_string(),
            resolver: Box::new(BaselineResolver::new()),
            origin: DrawOrigin::Baseline,
            output: Vec::new(),
            layer_split_written: false,
        })
    }

    pub fn with_resolver(mut self, resolver: impl OriginResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn font(&self) -> &ResourceKey {
        self.targets[0].1.key()
    }

    pub fn origin(&self) -> &DrawOrigin {
        &self.origin
    }

    /// Later draw offsets are relative to `origin`.
    pub fn set_origin(&mut self, origin: DrawOrigin) -> &mut Self {
        self.origin = origin;
        self
    }

    /// Net horizontal shift emitted so far, not counting glyph advances.
    pub fn shift_total(&self) -> i32 {
        self.output
            .iter()
            .map(|g| match g {
                GlyphIdentifier::Space(s) => s.advance,
                GlyphIdentifier::Image(_) => 0,
            })
            .sum()
    }

    pub fn shift_right(&mut self, pixels: i32) -> Result<&mut Self> {
        // A zero advance leaves the cursor where it is; no glyph is emitted.
        if pixels == 0 {
            return Ok(self);
        }
        for (pack, font) in &mut self.targets {
            font.add_space_glyph(pixels)?;
            font.save(pack)?;
        }
        self.output.push(GlyphIdentifier::space(pixels));
        Ok(self)
    }

    #[inline(always)]
    pub fn shift_left(&mut self, pixels: i32) -> Result<&mut Self> {
        self.shift_right(-pixels)
    }

    fn register_image(&mut self, glyph: ImageGlyph) -> Result<()> {
        for (pack, font) in &mut self.targets {
            let c = font.add_image_glyph(&glyph.texture, glyph.height, glyph.ascent)?;
            font.save(pack)?;
            trace!("{} -> U+{:04X} in {}", glyph.texture, c as u32, font.key());
        }
        self.output.push(GlyphIdentifier::Image(glyph));
        Ok(())
    }

    fn generated_key(&self, path: String) -> Result<ResourceKey> {
        ResourceKey::new(self.generated_namespace.as_str(), path)
    }

    fn write_texture(&mut self, key: &ResourceKey, image: &RgbaImage) -> Result<()> {
        let bytes = texture::encode_png(image)?;
        let path = key.texture_path();
        for (pack, _) in &mut self.targets {
            pack.write(&path, &bytes)?;
        }
        Ok(())
    }

    fn read_texture(&self, key: &ResourceKey) -> Result<RgbaImage> {
        let primary: Vec<&Pack> = self.targets.iter().map(|(pack, _)| &**pack).collect();
        let bytes = lookup::read_consistent(&primary, self.fallback, &key.texture_path())?;
        texture::decode_png(&bytes)
    }

    /// Insert a zero-width glyph that splits rendering, so whatever is drawn
    /// after it appears in front of whatever came before.
    pub fn new_layer(&mut self) -> Result<&mut Self> {
        let key = self.generated_key(LAYER_SPLIT_TEXTURE.to_string())?;
        if !self.layer_split_written {
            self.write_texture(&key, &texture::layer_split_image())?;
            self.layer_split_written = true;
        }
        self.register_image(ImageGlyph {
            texture: key,
            height: Some(LAYER_SPLIT_HEIGHT),
            ascent: LAYER_SPLIT_ASCENT,
        })?;
        Ok(self)
    }

    /// Draw `texture_key` with its top-left corner at `(x, y)` from the current origin.
    /// Negative `y` is above the baseline.
    pub fn draw_image(&mut self, texture_key: &ResourceKey, x: i32, y: i32) -> Result<&mut Self> {
        let (origin_x, origin_y) = self.origin.resolve(self.resolver.as_ref())?;
        let (x, y) = (origin_x + x, origin_y + y);
        let mut key = texture_key.with_extension("png");

        self.shift_right(x)?;
        let ascent = -y;

        let image = self.read_texture(&key)?;
        let longest = image.width().max(image.height());
        let mut size = i32::try_from(longest)
            .map_err(|_| Error::Constraint(format!("texture {key} is too large")))?;
        if ascent > size {
            size = ascent;
        }
        let side = size.unsigned_abs();

        if !texture::is_square(&image, side) {
            let resized = self.generated_key(format!(
                "{}/{}_{size}.png",
                key.namespace(),
                key.path_without_extension("png")
            ))?;
            debug!(
                "Placing {key} ({}x{}) on a {size}x{size} canvas as {resized}.",
                image.width(),
                image.height()
            );
            self.write_texture(&resized, &texture::square_canvas(&image, side))?;
            key = resized;
        }

        let width = i32::try_from(texture::effective_width(&image)).unwrap_or(size);
        self.register_image(ImageGlyph {
            texture: key,
            height: Some(size),
            ascent,
        })?;

        // One extra pixel: the client always leaves a gap after a glyph.
        self.shift_left(x + width + 1)?;
        Ok(self)
    }

    /// Store `image` as a generated texture named after its content, then draw it.
    pub fn draw_rgba(&mut self, image: &RgbaImage, x: i32, y: i32) -> Result<&mut Self> {
        let key = self.generated_key(format!("img/{}.png", texture::content_hash(image)))?;
        self.write_texture(&key, image)?;
        self.draw_image(&key, x, y)
    }

    pub fn build(&self) -> GlyphSequence {
        GlyphSequence::new(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_GENERATED_NAMESPACE, GlyphCompiler};
    use crate::error::Error;
    use crate::font::definition::{BitmapProvider, FontDefinition};
    use crate::font::origin::{BaselineResolver, DrawOrigin};
    use crate::font::{GlyphIdentifier, ImageGlyph};
    use crate::key::ResourceKey;
    use crate::pack::Pack;
    use crate::texture;
    use image::{Rgba, RgbaImage};

    fn key(s: &str) -> ResourceKey {
        s.parse().unwrap()
    }

    fn opaque(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    fn put_texture(pack: &mut Pack, k: &str, img: &RgbaImage) {
        let path = key(k).with_extension("png").texture_path();
        pack.write(&path, &texture::encode_png(img).unwrap()).unwrap();
    }

    fn packs(n: usize) -> (tempfile::TempDir, Vec<Pack>) {
        let dir = tempfile::tempdir().unwrap();
        let packs = (0..n)
            .map(|i| Pack::open_directory(dir.path().join(format!("p{i}"))).unwrap())
            .collect();
        (dir, packs)
    }

    fn images(glyphs: &[GlyphIdentifier]) -> Vec<&ImageGlyph> {
        glyphs
            .iter()
            .filter_map(|g| match g {
                GlyphIdentifier::Image(i) => Some(i),
                GlyphIdentifier::Space(_) => None,
            })
            .collect()
    }

    fn bitmap_count(pack: &mut Pack) -> usize {
        let font = FontDefinition::load_or_create(pack, key("mypack:gui")).unwrap();
        font.providers()
            .iter()
            .filter_map(BitmapProvider::from_json)
            .count()
    }

    #[test]
    fn square_texture_at_baseline() {
        let (_d, mut p) = packs(1);
        put_texture(&mut p[0], "mypack:gui/box", &opaque(8, 8));
        let seq = {
            let mut c = GlyphCompiler::new(
                p.iter_mut().collect(),
                None,
                &key("mypack:gui"),
                DEFAULT_GENERATED_NAMESPACE,
            )
            .unwrap();
            c.draw_image(&key("mypack:gui/box"), 0, 0).unwrap();
            assert_eq!(c.shift_total(), -9, "only the glyph advance is undone");
            c.build()
        };
        let expected = ImageGlyph {
            texture: key("mypack:gui/box.png"),
            height: Some(8),
            ascent: 0,
        };
        assert_eq!(images(seq.glyphs()), vec![&expected]);
        assert_eq!(bitmap_count(&mut p[0]), 1);
    }

    #[test]
    fn tall_ascent_grows_the_canvas() {
        let (_d, mut p) = packs(1);
        put_texture(&mut p[0], "mypack:gui/box", &opaque(16, 16));
        let seq = {
            let mut c =
                GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
            c.draw_image(&key("mypack:gui/box"), 0, -40).unwrap();
            c.build()
        };
        let glyph = images(seq.glyphs())[0].clone();
        assert_eq!(glyph.ascent, 40);
        assert!(glyph.height.unwrap() >= 40);
        assert_eq!(glyph.texture, key("gen:mypack/gui/box_40.png"));

        let bytes = p[0].read(&glyph.texture.texture_path()).unwrap();
        let canvas = texture::decode_png(&bytes).unwrap();
        assert_eq!(canvas.dimensions(), (40, 40));
        assert_eq!(canvas.get_pixel(0, 0)[3], 255, "source anchored at the top-left");
        assert_eq!(canvas.get_pixel(15, 15)[3], 255);
        assert_eq!(canvas.get_pixel(16, 16)[3], 0);
    }

    #[test]
    fn non_square_texture_is_padded() {
        let (_d, mut p) = packs(1);
        put_texture(&mut p[0], "mypack:gui/bar", &opaque(12, 3));
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        c.draw_image(&key("mypack:gui/bar"), 0, 0).unwrap();
        let seq = c.build();
        let glyph = images(seq.glyphs())[0];
        assert_eq!(glyph.height, Some(12));
        assert_eq!(glyph.texture, key("gen:mypack/gui/bar_12.png"));
    }

    #[test]
    fn cursor_returns_after_every_draw() {
        let (_d, mut p) = packs(1);
        let mut half = RgbaImage::new(10, 10);
        for y in 0..10 {
            for x in 0..4 {
                half.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        put_texture(&mut p[0], "mypack:a", &opaque(8, 8));
        put_texture(&mut p[0], "mypack:b", &half);
        let resolver = BaselineResolver::new().with_anchor("slot", 7, -3);
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen")
            .unwrap()
            .with_resolver(resolver);

        let mut gaps = 0;
        for (k, x, y, w) in [("mypack:a", 5, 2, 8), ("mypack:b", -13, -20, 4), ("mypack:a", 0, 0, 8)] {
            c.draw_image(&key(k), x, y).unwrap();
            gaps += w + 1;
        }
        c.set_origin(DrawOrigin::anchor("slot").offset(2, 2));
        c.draw_image(&key("mypack:b"), 30, 1).unwrap();
        gaps += 4 + 1;
        assert_eq!(c.shift_total() + gaps, 0, "shifts cancel the glyph advances");
    }

    #[test]
    fn origin_moves_the_glyph() {
        let (_d, mut p) = packs(1);
        put_texture(&mut p[0], "mypack:a", &opaque(8, 8));
        let resolver = BaselineResolver::new().with_anchor("title", 4, -10);
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen")
            .unwrap()
            .with_resolver(resolver);
        c.set_origin(DrawOrigin::anchor("title"));
        c.draw_image(&key("mypack:a"), 1, 2).unwrap();
        let seq = c.build();
        assert_eq!(seq.glyphs()[0], GlyphIdentifier::space(5));
        assert_eq!(images(seq.glyphs())[0].ascent, 8);
    }

    #[test]
    fn fans_out_to_every_target() {
        let (_d, mut p) = packs(2);
        for pack in &mut p {
            put_texture(pack, "mypack:a", &opaque(8, 8));
        }
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        c.draw_image(&key("mypack:a"), 3, 0).unwrap();
        drop(c);
        let fonts: Vec<_> = p
            .iter()
            .map(|pack| pack.read("assets/mypack/font/gui.json").unwrap())
            .collect();
        assert_eq!(fonts[0], fonts[1], "fonts stay in lockstep");
    }

    #[test]
    fn texture_in_one_target_only_is_inconsistent() {
        let (_d, mut p) = packs(2);
        put_texture(&mut p[1], "mypack:a", &opaque(8, 8));
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        let err = c.draw_image(&key("mypack:a"), 0, 0).unwrap_err();
        assert!(matches!(err, Error::Inconsistent { .. }));
    }

    #[test]
    fn reads_vanilla_textures_and_reports_missing_ones() {
        let (_d, mut p) = packs(2);
        let (main, vanilla) = p.split_at_mut(1);
        put_texture(&mut vanilla[0], "item/stick", &opaque(16, 16));
        let mut c = GlyphCompiler::new(
            vec![&mut main[0]],
            Some(&vanilla[0]),
            &key("mypack:gui"),
            "gen",
        )
        .unwrap();
        c.draw_image(&key("item/stick"), 0, 0).unwrap();
        assert!(c.draw_image(&key("item/nothing"), 0, 0).unwrap_err().is_not_found());
    }

    #[test]
    fn layer_split_is_written_once() {
        let (_d, mut p) = packs(1);
        let seq = {
            let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
            c.new_layer().unwrap().new_layer().unwrap();
            c.build()
        };
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.glyphs()[0], seq.glyphs()[1]);
        assert_eq!(
            seq.glyphs()[0],
            GlyphIdentifier::image(key("gen:split.png"), Some(-2), -32767)
        );
        assert!(p[0].exists("assets/gen/textures/split.png"));
        assert_eq!(bitmap_count(&mut p[0]), 1);
    }

    #[test]
    fn in_memory_images_get_content_keys() {
        let (_d, mut p) = packs(1);
        let img = opaque(4, 4);
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        c.draw_rgba(&img, 0, 0).unwrap();
        let seq = c.build();
        let expected = format!("gen:img/{}.png", texture::content_hash(&img));
        assert_eq!(images(seq.glyphs())[0].texture.to_string(), expected);
    }

    #[test]
    fn zero_shifts_emit_nothing() {
        let (_d, mut p) = packs(1);
        let mut c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        c.shift_right(0).unwrap().shift_left(0).unwrap();
        assert_eq!(c.shift_total(), 0);
        assert!(c.build().is_empty(), "no space glyph for a zero advance");
    }

    #[test]
    fn debug_output_names_the_font() {
        let (_d, mut p) = packs(1);
        let c = GlyphCompiler::new(p.iter_mut().collect(), None, &key("mypack:gui"), "gen").unwrap();
        let text = format!("{c:?}");
        assert!(text.starts_with("GlyphCompiler"), "{text}");
        assert!(text.contains("mypack:gui"), "{text}");
    }

    #[test]
    fn needs_a_target() {
        assert!(matches!(
            GlyphCompiler::new(Vec::new(), None, &key("mypack:gui"), "gen"),
            Err(Error::IllegalState(_))
        ));
    }
}

use crate::domain::quote::QuoteType;

// Checked in order; the first rule with a matching fragment wins.
const RULES: &[(&[&str], QuoteType)] = &[
    (
        &["/cotizacion-dolar-oficial", "/cotizaciondolaroficial"],
        QuoteType::Oficial,
    ),
    (
        &["/cotizacion-dolar-blue", "/cotizaciondolarblue"],
        QuoteType::Blue,
    ),
    (
        &[
            "/cotizacion-dolar-mep",
            "/cotizaciondolarmep",
            "/cotizaciondolarbolsa",
        ],
        QuoteType::Mep,
    ),
    (
        &[
            "/cotizacion-dolar-ccl",
            "/cotizaciondolarccl",
            "/cotizaciondolarcontadoconliqui",
        ],
        QuoteType::Ccl,
    ),
    (
        &[
            "/cotizacion-dolar-cripto",
            "/cotizaciondolarcripto",
            "/seccion/bitcoins",
        ],
        QuoteType::Cripto,
    ),
    (
        &["/cotizacion-dolar-tarjeta", "/cotizaciondolartarjeta"],
        QuoteType::Tarjeta,
    ),
];

/// Maps a tile's link target to the quote type it shows.
pub fn classify(link_target: &str) -> Option<QuoteType> {
    RULES
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| link_target.contains(f)))
        .map(|(_, quote_type)| *quote_type)
}

fn main() {
    // A family feature must come with a package, and a package must come
    // with its family. The `lpc1756`/`lpc1788`/`lpc802m001jdh16`/
    // `lpc802m001jdh20` features select both halves consistently.
    if cfg!(feature = "17xx") && !(cfg!(feature = "lqfp80") || cfg!(feature = "lqfp208")) {
        panic!("\n\n\nNo LPC17xx package selected. Use the `lpc1756` or `lpc1788` feature instead of `17xx`.\n\n\n");
    }
    if (cfg!(feature = "lqfp80") || cfg!(feature = "lqfp208")) && !cfg!(feature = "17xx") {
        panic!("\n\n\nLPC17xx package selected without the `17xx` family. Use the `lpc1756` or `lpc1788` feature.\n\n\n");
    }
    if cfg!(feature = "802") && !(cfg!(feature = "tssop16") || cfg!(feature = "tssop20")) {
        panic!("\n\n\nNo LPC802 package selected. Use the `lpc802m001jdh16` or `lpc802m001jdh20` feature instead of `802`.\n\n\n");
    }
    if (cfg!(feature = "tssop16") || cfg!(feature = "tssop20")) && !cfg!(feature = "802") {
        panic!("\n\n\nLPC802 package selected without the `802` family. Use the `lpc802m001jdh16` or `lpc802m001jdh20` feature.\n\n\n");
    }
}
